use sqlx::PgPool;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::ProductFeature,
    services::CatalogReader,
};

/// Reads the product catalog from PostgreSQL
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogReader for PgCatalog {
    async fn fetch_all_products(&self) -> AppResult<Vec<ProductFeature>> {
        let products = sqlx::query_as::<_, ProductFeature>(
            r#"
            SELECT id,
                   name,
                   category,
                   price::float8 AS price,
                   COALESCE(rating, 0)::float8 AS rating,
                   COALESCE(tags, '{}') AS tags,
                   COALESCE(description, '') AS description
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(products = products.len(), "Catalog loaded from database");

        Ok(products)
    }
}

/// Read-through Redis cache in front of another catalog reader
pub struct CachedCatalog<R> {
    inner: R,
    cache: Cache,
    ttl: u64,
}

impl<R: CatalogReader> CachedCatalog<R> {
    pub fn new(inner: R, cache: Cache, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait::async_trait]
impl<R: CatalogReader> CatalogReader for CachedCatalog<R> {
    async fn fetch_all_products(&self) -> AppResult<Vec<ProductFeature>> {
        // An empty catalog is a seeding problem; don't pin it in the cache
        cached!(
            self.cache,
            CacheKey::Catalog,
            self.ttl,
            |products: &Vec<ProductFeature>| !products.is_empty(),
            async { self.inner.fetch_all_products().await }
        )
    }
}
