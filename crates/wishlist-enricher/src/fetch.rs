//! Outbound HTTP fetch of third-party product pages.

use std::time::Duration;

use reqwest::{redirect, Client, Url};

use crate::error::EnrichError;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; relative references on the page resolve against it.
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// HTTP GET adapter for product pages.
///
/// Sends a browser-like `User-Agent`, prefers HTML, follows redirects, and
/// asks every intermediary to bypass caches. It never retries.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Builds a fetcher with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::HttpClient`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(EnrichError::HttpClient)?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns the body of a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`EnrichError::HttpStatus`] for any non-2xx final status.
    /// - [`EnrichError::Transport`] for network, TLS, timeout, redirect-loop,
    ///   or body decoding failures.
    pub async fn fetch_html(&self, url: &Url) -> Result<FetchedPage, EnrichError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT_HTML)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .header(reqwest::header::PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await?;

        tracing::debug!(
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = body.len(),
            "fetched product page"
        );

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}
