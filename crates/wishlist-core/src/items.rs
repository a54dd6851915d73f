use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::products::ExtractionStatus;

/// Category assigned when the client does not send one.
pub const DEFAULT_CATEGORY: &str = "other";

/// Enrichment state stored on a wishlist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichStatus {
    /// Enrichment has been dispatched but has not written a result yet.
    Pending,
    Ok,
    Failed,
}

impl EnrichStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnrichStatus::Pending => "pending",
            EnrichStatus::Ok => "ok",
            EnrichStatus::Failed => "failed",
        }
    }

    /// Parses the stored column value. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EnrichStatus::Pending),
            "ok" => Some(EnrichStatus::Ok),
            "failed" => Some(EnrichStatus::Failed),
            _ => None,
        }
    }
}

impl From<ExtractionStatus> for EnrichStatus {
    fn from(status: ExtractionStatus) -> Self {
        match status {
            ExtractionStatus::Ok => EnrichStatus::Ok,
            ExtractionStatus::Failed => EnrichStatus::Failed,
        }
    }
}

impl std::fmt::Display for EnrichStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a wishlist item was submitted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    #[default]
    AppManual,
    MobileShare,
    Extension,
}

impl ItemSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemSource::AppManual => "app_manual",
            ItemSource::MobileShare => "mobile_share",
            ItemSource::Extension => "extension",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "app_manual" => Some(ItemSource::AppManual),
            "mobile_share" => Some(ItemSource::MobileShare),
            "extension" => Some(ItemSource::Extension),
            _ => None,
        }
    }
}

/// A saved product on a user's wishlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Owning user id, as issued by the identity provider.
    pub uid: String,
    pub item_id: Uuid,
    pub title: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub shop: String,
    pub product_url: String,
    /// Empty string when no image is known yet.
    pub image_url: String,
    /// Purchase workflow state; new items start as `"todo"`.
    pub status: String,
    pub target_price: Option<f64>,
    pub virtual_saved: f64,
    pub domain: String,
    pub category: String,
    pub source: ItemSource,
    pub enrich_status: EnrichStatus,
    pub enrich_error: Option<String>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
