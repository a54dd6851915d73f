use serde::{Deserialize, Serialize};

/// Outcome of one enrichment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Ok,
    Failed,
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStatus::Ok => write!(f, "ok"),
            ExtractionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Product metadata resolved for a single source URL.
///
/// Built fresh for every enrichment call and handed to the persistence layer
/// as-is. Each optional field holds the single winning value across all
/// signal sources, or `None` when no source supplied one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: Option<String>,
    /// Absolute URL of the product image.
    pub image_url: Option<String>,
    /// Non-negative, finite amount in `currency` units.
    pub price: Option<f64>,
    /// ISO 4217 code (e.g. `"EUR"`), or a guess derived from a currency symbol.
    pub currency: Option<String>,
    /// Host of `source_url` with any leading `www.` removed.
    pub domain: String,
    /// The URL exactly as the caller supplied it.
    pub source_url: String,
    pub status: ExtractionStatus,
    /// Human-readable failure reason; `Some` only when `status` is `Failed`.
    pub error_reason: Option<String>,
}

impl ProductRecord {
    /// A failed record carrying only the identifying fields and a reason.
    #[must_use]
    pub fn failed(
        source_url: impl Into<String>,
        domain: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            title: None,
            image_url: None,
            price: None,
            currency: None,
            domain: domain.into(),
            source_url: source_url.into(),
            status: ExtractionStatus::Failed,
            error_reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Ok
    }
}
