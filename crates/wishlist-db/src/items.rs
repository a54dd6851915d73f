//! Database operations for `wishlist_items`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use wishlist_core::{EnrichStatus, ExtractionStatus, ItemSource, ProductRecord, WishlistItem};

use crate::DbError;

const ITEM_COLUMNS: &str = "uid, item_id, title, price, currency, shop, product_url, image_url, \
     status, target_price, virtual_saved, domain, category, source, enrich_status, \
     enrich_error, enriched_at, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `wishlist_items` table.
///
/// `source` and `enrich_status` are stored as text guarded by check
/// constraints; convert with [`WishlistItem::try_from`] for typed access.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistItemRow {
    pub uid: String,
    pub item_id: Uuid,
    pub title: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub shop: String,
    pub product_url: String,
    pub image_url: String,
    pub status: String,
    pub target_price: Option<f64>,
    pub virtual_saved: f64,
    pub domain: String,
    pub category: String,
    pub source: String,
    pub enrich_status: String,
    pub enrich_error: Option<String>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WishlistItemRow> for WishlistItem {
    type Error = DbError;

    fn try_from(row: WishlistItemRow) -> Result<Self, Self::Error> {
        let source = ItemSource::parse(&row.source).ok_or_else(|| DbError::InvalidColumn {
            column: "source",
            value: row.source.clone(),
        })?;
        let enrich_status =
            EnrichStatus::parse(&row.enrich_status).ok_or_else(|| DbError::InvalidColumn {
                column: "enrich_status",
                value: row.enrich_status.clone(),
            })?;

        Ok(WishlistItem {
            uid: row.uid,
            item_id: row.item_id,
            title: row.title,
            price: row.price,
            currency: row.currency,
            shop: row.shop,
            product_url: row.product_url,
            image_url: row.image_url,
            status: row.status,
            target_price: row.target_price,
            virtual_saved: row.virtual_saved,
            domain: row.domain,
            category: row.category,
            source,
            enrich_status,
            enrich_error: row.enrich_error,
            enriched_at: row.enriched_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a freshly submitted item. Enrichment state starts as `pending`.
#[derive(Debug, Clone)]
pub struct NewWishlistItem {
    pub title: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub shop: String,
    pub product_url: String,
    pub image_url: String,
    pub domain: String,
    pub category: String,
    pub source: ItemSource,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a new item owned by `uid` with `enrich_status = 'pending'`.
///
/// Generates the `item_id` in Rust and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_item(
    pool: &PgPool,
    uid: &str,
    item: &NewWishlistItem,
) -> Result<WishlistItemRow, DbError> {
    let item_id = Uuid::new_v4();

    let sql = format!(
        "INSERT INTO wishlist_items \
             (uid, item_id, title, price, currency, shop, product_url, image_url, \
              domain, category, source, enrich_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending') \
         RETURNING {ITEM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, WishlistItemRow>(&sql)
        .bind(uid)
        .bind(item_id)
        .bind(&item.title)
        .bind(item.price)
        .bind(item.currency.as_deref())
        .bind(&item.shop)
        .bind(&item.product_url)
        .bind(&item.image_url)
        .bind(&item.domain)
        .bind(&item.category)
        .bind(item.source.as_str())
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Fetches one item by its owner and id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, [`DbError::InvalidColumn`]
/// if a stored status cannot be parsed, or [`DbError::Sqlx`] on query failure.
pub async fn get_item(pool: &PgPool, uid: &str, item_id: Uuid) -> Result<WishlistItem, DbError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM wishlist_items WHERE uid = $1 AND item_id = $2");
    sqlx::query_as::<_, WishlistItemRow>(&sql)
        .bind(uid)
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
        .and_then(WishlistItem::try_from)
}

/// Resets an item to `pending` and clears the previous enrichment error.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] on
/// query failure.
pub async fn mark_enrich_pending(pool: &PgPool, uid: &str, item_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE wishlist_items \
         SET enrich_status = 'pending', enrich_error = NULL, updated_at = NOW() \
         WHERE uid = $1 AND item_id = $2",
    )
    .bind(uid)
    .bind(item_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Writes an enrichment outcome onto the item keyed by `(uid, item_id)`.
///
/// On success the product fields, `shop` (mirrored from the domain), and the
/// enrichment state are written; a missing price leaves the stored price and
/// its currency untouched. On failure only `enrich_status`, `enrich_error`, and
/// `enriched_at` change. A row that does not exist yet is created from the
/// record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn apply_enrichment(
    pool: &PgPool,
    uid: &str,
    item_id: Uuid,
    record: &ProductRecord,
) -> Result<WishlistItemRow, DbError> {
    let title = record.title.as_deref().unwrap_or(&record.domain);
    let image_url = record.image_url.as_deref().unwrap_or_default();
    let enrich_status = EnrichStatus::from(record.status);

    let update = match record.status {
        ExtractionStatus::Ok => {
            "title = EXCLUDED.title, \
             image_url = EXCLUDED.image_url, \
             price = COALESCE(EXCLUDED.price, wishlist_items.price), \
             currency = CASE WHEN EXCLUDED.price IS NULL \
                             THEN wishlist_items.currency \
                             ELSE EXCLUDED.currency END, \
             domain = EXCLUDED.domain, \
             shop = EXCLUDED.shop, \
             enrich_status = EXCLUDED.enrich_status, \
             enrich_error = NULL, \
             enriched_at = EXCLUDED.enriched_at, \
             updated_at = NOW()"
        }
        ExtractionStatus::Failed => {
            "enrich_status = EXCLUDED.enrich_status, \
             enrich_error = EXCLUDED.enrich_error, \
             enriched_at = EXCLUDED.enriched_at"
        }
    };

    let sql = format!(
        "INSERT INTO wishlist_items \
             (uid, item_id, title, price, currency, shop, product_url, image_url, \
              domain, enrich_status, enrich_error, enriched_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $6, $9, $10, NOW()) \
         ON CONFLICT (uid, item_id) DO UPDATE SET {update} \
         RETURNING {ITEM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, WishlistItemRow>(&sql)
        .bind(uid)
        .bind(item_id)
        .bind(title)
        .bind(record.price)
        .bind(record.currency.as_deref())
        .bind(&record.domain)
        .bind(&record.source_url)
        .bind(image_url)
        .bind(enrich_status.as_str())
        .bind(record.error_reason.as_deref())
        .fetch_one(pool)
        .await?;

    tracing::debug!(
        uid,
        %item_id,
        enrich_status = %enrich_status,
        "enrichment persisted"
    );
    Ok(row)
}
