use serde::{Deserialize, Serialize};

use super::ProductFeature;

/// A ranked product suggestion returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub rating: f64,
    /// Always within [0.5, 1.0]
    ///
    /// Entries backfilled behind inference picks are capped at the last pick's
    /// confidence, so several of them may report the same value.
    pub confidence: f64,
    /// Human-readable reasons, generated ones first
    pub reasons: Vec<String>,
}

impl Recommendation {
    pub fn from_product(product: &ProductFeature, confidence: f64, reasons: Vec<String>) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            rating: product.rating,
            confidence,
            reasons,
        }
    }
}

/// Response body for the recommendations endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub message: String,
}

impl From<Vec<Recommendation>> for RecommendationResponse {
    fn from(recommendations: Vec<Recommendation>) -> Self {
        let message = if recommendations.is_empty() {
            "No recommendations available for this user"
        } else {
            "Recommendations generated successfully"
        };

        Self {
            count: recommendations.len(),
            recommendations,
            message: message.to_string(),
        }
    }
}
