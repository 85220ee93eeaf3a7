pub mod catalog;
pub mod postgres;
pub mod purchases;
pub mod redis;

pub use catalog::{CachedCatalog, PgCatalog};
pub use postgres::{create_pool, run_migrations};
pub use purchases::PgPurchaseHistory;
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
