pub mod enrich;
pub mod error;
pub mod fetch;
pub mod jsonld;
pub mod normalize;
pub mod signals;
pub mod types;
pub mod urls;

pub use enrich::{extract_product, merge_candidates, Enricher, SIGNAL_PRIORITY};
pub use error::EnrichError;
pub use fetch::{FetchedPage, PageFetcher};
pub use normalize::{extract_currency_loose, normalize_amount, normalize_json_amount};
pub use types::{ExtractionCandidate, SignalSource};
pub use urls::{domain_from_str, domain_from_url, parse_source_url, UNKNOWN_DOMAIN};
