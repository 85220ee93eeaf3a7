pub mod inference;
pub mod recommendations;
pub mod stores;

pub use inference::InferenceProvider;
pub use recommendations::RecommendationEngine;
pub use stores::{CatalogReader, PurchaseHistoryReader};
