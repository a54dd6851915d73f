//! Background enrichment dispatch.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;
use wishlist_core::ProductRecord;
use wishlist_db::DbError;
use wishlist_enricher::Enricher;

/// Enriches `url` and persists the outcome onto `(uid, item_id)`.
///
/// # Errors
///
/// Returns [`DbError`] if the result cannot be written. Enrichment itself
/// never fails; failures are recorded on the item.
pub async fn run_enrichment(
    pool: &PgPool,
    enricher: &Enricher,
    uid: &str,
    item_id: Uuid,
    url: &str,
) -> Result<ProductRecord, DbError> {
    let record = enricher.enrich(url).await;
    wishlist_db::apply_enrichment(pool, uid, item_id, &record).await?;
    Ok(record)
}

/// Spawns [`run_enrichment`] without waiting for it.
///
/// The task handle is dropped; a persistence error is logged and otherwise
/// ignored, leaving the item in its previous state.
pub fn spawn_enrichment(
    pool: PgPool,
    enricher: Arc<Enricher>,
    uid: String,
    item_id: Uuid,
    url: String,
) {
    tokio::spawn(async move {
        match run_enrichment(&pool, &enricher, &uid, item_id, &url).await {
            Ok(record) => tracing::debug!(
                uid = %uid,
                %item_id,
                status = %record.status,
                "background enrichment stored"
            ),
            Err(e) => tracing::error!(
                uid = %uid,
                %item_id,
                error = %e,
                "failed to store background enrichment"
            ),
        }
    });
}
