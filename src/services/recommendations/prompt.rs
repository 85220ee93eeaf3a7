use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::ProductFeature,
};

use super::profile::PreferenceProfile;
use super::MAX_RECOMMENDATIONS;

const TOP_CATEGORY_COUNT: usize = 3;

/// Candidate fields shared with the inference service
#[derive(Debug, Serialize)]
struct PromptProduct<'a> {
    id: &'a str,
    name: &'a str,
    category: &'a str,
    price: f64,
    rating: f64,
    tags: &'a [String],
}

impl<'a> From<&'a ProductFeature> for PromptProduct<'a> {
    fn from(product: &'a ProductFeature) -> Self {
        Self {
            id: &product.id,
            name: &product.name,
            category: &product.category,
            price: product.price,
            rating: product.rating,
            tags: &product.tags,
        }
    }
}

/// Builds the text request sent to the inference service
///
/// The request carries the user's top categories, price range, rating
/// behaviour and every candidate, and asks for a ranked JSON array of
/// `{productId, relevance, explanation}` objects.
pub fn compose_request(
    profile: &PreferenceProfile,
    candidates: &[ProductFeature],
) -> AppResult<String> {
    let categories = profile
        .top_categories(TOP_CATEGORY_COUNT)
        .into_iter()
        .map(|(category, quantity)| format!("{}({} purchases)", category, quantity))
        .collect::<Vec<_>>()
        .join(", ");

    let price_range = if profile.price_range.is_empty() {
        "unknown".to_string()
    } else {
        format!(
            "${} to ${}",
            profile.price_range.min, profile.price_range.max
        )
    };

    let products: Vec<PromptProduct> = candidates.iter().map(PromptProduct::from).collect();
    let product_list = serde_json::to_string_pretty(&products)
        .map_err(|e| AppError::Internal(format!("Failed to encode candidates: {}", e)))?;

    Ok(format!(
        r#"Given a user's purchase history:
Categories: {categories}
Price Range: {price_range}
Average Rating: {average_rating:.1}
Total Purchases: {rated_purchases}

Available Products:
{product_list}

Please analyze this data and recommend the top {limit} products that would be most relevant to this user.
Consider their category preferences, price range, and rating preferences.
Format your response as a JSON array of objects in order of relevance, with a brief explanation for each.
Use only product IDs from the list above. Relevance must be one of "high", "medium" or "low".
Example format:
[
    {{
        "productId": "id1",
        "relevance": "high",
        "explanation": "Matches user's category preference and price range"
    }}
]"#,
        categories = categories,
        price_range = price_range,
        average_rating = profile.average_rating,
        rated_purchases = profile.rated_purchases,
        product_list = product_list,
        limit = MAX_RECOMMENDATIONS,
    ))
}
