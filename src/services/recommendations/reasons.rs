use crate::models::ProductFeature;

use super::profile::PreferenceProfile;
use super::scoring::CategoryWeights;

/// Fraction of the observed price-range width a price may sit from the midpoint
/// and still count as a typical purchase.
const PRICE_FIT_TOLERANCE: f64 = 0.2;

/// Explains, in plain language, why a product fits a user's profile
pub fn generate_reasons(
    product: &ProductFeature,
    profile: &PreferenceProfile,
    weights: &CategoryWeights,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if weights.weight(&product.category) > 0 {
        reasons.push(format!(
            "Matches your {} category preference",
            product.category
        ));
    }

    let range = &profile.price_range;
    let price_diff = (product.price - range.midpoint()).abs();
    if price_diff <= range.width() * PRICE_FIT_TOLERANCE {
        reasons.push("Price matches your typical purchase range".to_string());
    }

    if product.rating >= profile.average_rating {
        reasons.push("High-rated product matching your preferences".to_string());
    }

    reasons
}

/// Generated reasons followed by the inference service's explanation, if any
pub fn reasons_with_explanation(
    product: &ProductFeature,
    profile: &PreferenceProfile,
    weights: &CategoryWeights,
    explanation: Option<&str>,
) -> Vec<String> {
    let mut reasons = generate_reasons(product, profile, weights);

    if let Some(text) = explanation.map(str::trim).filter(|text| !text.is_empty()) {
        reasons.push(text.to_string());
    }

    reasons
}
