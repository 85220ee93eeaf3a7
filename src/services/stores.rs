/// Read-only access to the catalog and purchase-history stores
///
/// The recommendation engine depends only on these traits; the PostgreSQL
/// implementations live in `db`, and tests substitute in-memory ones.
use crate::{
    error::AppResult,
    models::{ProductFeature, PurchaseRecord},
};

#[async_trait::async_trait]
pub trait CatalogReader: Send + Sync {
    /// Every product in the catalog; empty when nothing has been seeded
    async fn fetch_all_products(&self) -> AppResult<Vec<ProductFeature>>;
}

#[async_trait::async_trait]
pub trait PurchaseHistoryReader: Send + Sync {
    /// A user's finalized orders, newest first
    ///
    /// Unknown users get an empty history, not an error.
    async fn fetch_history(&self, user_id: &str) -> AppResult<Vec<PurchaseRecord>>;
}
