/// A partial product record produced by one signal source.
///
/// A field is `Some` only when its source text was non-empty and, for
/// `price`, parsed to a finite non-negative amount.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionCandidate {
    pub title: Option<String>,
    /// Raw image reference; may still be relative to the page URL.
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
}

impl ExtractionCandidate {
    /// `true` once title, image, and at least one of price or currency are known.
    #[must_use]
    pub fn is_sufficient(&self) -> bool {
        self.title.is_some()
            && self.image_url.is_some()
            && (self.price.is_some() || self.currency.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.image_url.is_none()
            && self.price.is_none()
            && self.currency.is_none()
    }
}

/// A strategy that produces an [`ExtractionCandidate`] from a parsed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Embedded JSON-LD `Product` / `Offer` markup.
    StructuredData,
    /// Open Graph and Twitter Card meta tags plus CSS-selector heuristics.
    HtmlSignals,
}

impl SignalSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalSource::StructuredData => "json_ld",
            SignalSource::HtmlSignals => "html_signals",
        }
    }
}
