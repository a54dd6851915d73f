use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid source URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("no product data found")]
    NoProductData,
}

impl EnrichError {
    /// Short reason stored on a failed [`wishlist_core::ProductRecord`].
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            EnrichError::InvalidUrl { .. } => "invalid url".to_string(),
            EnrichError::HttpStatus { status, .. } => format!("HTTP {status}"),
            EnrichError::Transport(e) => format!("fetch failed: {e}"),
            EnrichError::HttpClient(e) => format!("http client unavailable: {e}"),
            EnrichError::NoProductData => "no product data found".to_string(),
        }
    }
}
