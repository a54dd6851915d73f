//! Extraction orchestrator: fetch, run every signal strategy on one parsed
//! document, and merge the candidates into a [`ProductRecord`].

use reqwest::Url;
use scraper::Html;
use wishlist_core::{ExtractionStatus, ProductRecord};

use crate::error::EnrichError;
use crate::fetch::PageFetcher;
use crate::jsonld::extract_from_json_ld;
use crate::signals::extract_from_html_signals;
use crate::types::{ExtractionCandidate, SignalSource};
use crate::urls::{domain_from_str, domain_from_url, parse_source_url, resolve_url};

/// Order in which candidates are consulted when merging; earlier wins.
pub const SIGNAL_PRIORITY: [SignalSource; 2] =
    [SignalSource::StructuredData, SignalSource::HtmlSignals];

/// Best-effort product metadata enricher.
///
/// Stateless apart from the shared HTTP connection pool, so one instance can
/// serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct Enricher {
    fetcher: PageFetcher,
}

impl Enricher {
    #[must_use]
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Builds an enricher with its own [`PageFetcher`].
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_settings(timeout_secs: u64, user_agent: &str) -> Result<Self, EnrichError> {
        Ok(Self::new(PageFetcher::new(timeout_secs, user_agent)?))
    }

    /// Fetches `url` and extracts product metadata from it.
    ///
    /// Never fails: invalid input, HTTP errors, transport errors, and pages
    /// without product data all resolve to a record with
    /// [`ExtractionStatus::Failed`] and a reason.
    pub async fn enrich(&self, url: &str) -> ProductRecord {
        let page_url = match parse_source_url(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(url, error = %e, "rejecting enrichment for invalid url");
                return ProductRecord::failed(url, domain_from_str(url), e.reason());
            }
        };
        let domain = domain_from_url(&page_url);

        let page = match self.fetcher.fetch_html(&page_url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url, domain = %domain, error = %e, "product page fetch failed");
                return ProductRecord::failed(url, domain, e.reason());
            }
        };

        let record = extract_product(&page.body, &page.final_url, url);
        tracing::info!(
            url,
            domain = %record.domain,
            status = %record.status,
            has_title = record.title.is_some(),
            has_image = record.image_url.is_some(),
            has_price = record.price.is_some(),
            "enrichment finished"
        );
        record
    }
}

/// Extracts a [`ProductRecord`] from already-fetched HTML.
///
/// `base_url` is the page's final URL (after redirects) and is used to
/// resolve relative image references; `source_url` is the caller's original
/// URL and determines `domain`.
#[must_use]
pub fn extract_product(html: &str, base_url: &Url, source_url: &str) -> ProductRecord {
    let domain = Url::parse(source_url.trim())
        .map_or_else(|_| domain_from_url(base_url), |u| domain_from_url(&u));

    let document = Html::parse_document(html);
    let candidates =
        SIGNAL_PRIORITY.map(|source| run_strategy(source, &document, base_url));
    let merged = merge_candidates(&candidates);

    // A domain-only title is a placeholder, not evidence of product data.
    let found = merged.title.is_some() || merged.image_url.is_some() || merged.price.is_some();

    let (status, error_reason) = if found {
        (ExtractionStatus::Ok, None)
    } else {
        (
            ExtractionStatus::Failed,
            Some(EnrichError::NoProductData.reason()),
        )
    };

    ProductRecord {
        title: merged.title.or_else(|| Some(domain.clone())),
        image_url: merged.image_url,
        price: merged.price,
        currency: merged.currency,
        domain,
        source_url: source_url.to_string(),
        status,
        error_reason,
    }
}

fn run_strategy(source: SignalSource, document: &Html, base_url: &Url) -> ExtractionCandidate {
    let mut candidate = match source {
        SignalSource::StructuredData => extract_from_json_ld(document),
        SignalSource::HtmlSignals => extract_from_html_signals(document, base_url),
    };
    candidate.image_url = candidate
        .image_url
        .and_then(|raw| resolve_url(base_url, &raw));

    tracing::debug!(
        source = source.as_str(),
        has_title = candidate.title.is_some(),
        has_image = candidate.image_url.is_some(),
        has_price = candidate.price.is_some(),
        has_currency = candidate.currency.is_some(),
        "signal candidate"
    );
    candidate
}

/// Merges candidates field by field; the first candidate with a value wins.
///
/// Candidates must already be in priority order. `price` and `currency` are
/// taken as supplied and never re-derived.
#[must_use]
pub fn merge_candidates(candidates: &[ExtractionCandidate]) -> ExtractionCandidate {
    fn first<T: Clone>(
        candidates: &[ExtractionCandidate],
        field: impl Fn(&ExtractionCandidate) -> &Option<T>,
    ) -> Option<T> {
        candidates.iter().find_map(|c| field(c).clone())
    }

    ExtractionCandidate {
        title: first(candidates, |c| &c.title),
        image_url: first(candidates, |c| &c.image_url),
        price: first(candidates, |c| &c.price),
        currency: first(candidates, |c| &c.currency),
    }
}

#[cfg(test)]
#[path = "enrich_test.rs"]
mod tests;
