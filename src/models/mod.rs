mod product;
mod purchase;
mod recommendation;

pub use product::ProductFeature;
pub use purchase::{LineItem, PurchaseRecord};
pub use recommendation::{Recommendation, RecommendationResponse};
