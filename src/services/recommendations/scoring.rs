use std::collections::HashMap;

use crate::models::ProductFeature;

use super::parser::Relevance;
use super::profile::PreferenceProfile;

/// Sub-score used for recency until per-category purchase dates are tracked
pub const RECENCY_SCORE: f64 = 0.8;

pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Weights applied to each sub-score; they sum to 1.0
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub category_match: f64,
    pub price_match: f64,
    pub rating_match: f64,
    pub purchase_frequency: f64,
    pub recency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            category_match: 0.35,
            price_match: 0.25,
            rating_match: 0.20,
            purchase_frequency: 0.15,
            recency: 0.05,
        }
    }
}

/// Category -> accumulated purchase quantity, with the max and total precomputed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryWeights {
    weights: HashMap<String, u64>,
    max: u64,
    total: u64,
}

impl CategoryWeights {
    pub fn weight(&self, category: &str) -> u64 {
        self.weights.get(category).copied().unwrap_or(0)
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl From<&PreferenceProfile> for CategoryWeights {
    fn from(profile: &PreferenceProfile) -> Self {
        Self {
            max: profile.categories.values().copied().max().unwrap_or(0),
            total: profile.categories.values().sum(),
            weights: profile.categories.clone(),
        }
    }
}

/// Individual sub-scores for one candidate, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub category_match: f64,
    pub price_match: f64,
    pub rating_match: f64,
    pub purchase_frequency: f64,
    pub recency: f64,
}

impl ScoreBreakdown {
    pub fn weighted_sum(&self, weights: &ScoreWeights) -> f64 {
        weights.category_match * self.category_match
            + weights.price_match * self.price_match
            + weights.rating_match * self.rating_match
            + weights.purchase_frequency * self.purchase_frequency
            + weights.recency * self.recency
    }
}

/// Deterministic confidence scorer bound to one request's profile
///
/// Built fresh per request; holds no state beyond the profile it was given.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer<'a> {
    profile: &'a PreferenceProfile,
    category_weights: CategoryWeights,
    weights: ScoreWeights,
}

impl<'a> ConfidenceScorer<'a> {
    pub fn new(profile: &'a PreferenceProfile) -> Self {
        Self {
            profile,
            category_weights: CategoryWeights::from(profile),
            weights: ScoreWeights::default(),
        }
    }

    pub fn profile(&self) -> &PreferenceProfile {
        self.profile
    }

    pub fn category_weights(&self) -> &CategoryWeights {
        &self.category_weights
    }

    pub fn category_weight(&self, product: &ProductFeature) -> u64 {
        self.category_weights.weight(&product.category)
    }

    pub fn breakdown(&self, product: &ProductFeature) -> ScoreBreakdown {
        let weights = &self.category_weights;
        let category_weight = weights.weight(&product.category) as f64;

        let category_match = if weights.max() > 0 {
            category_weight / weights.max() as f64
        } else {
            0.5
        };

        let range = &self.profile.price_range;
        let price_diff = (product.price - range.midpoint()).abs();
        let price_match = (1.0 - price_diff / range.width().max(1.0)).max(0.0);

        let rating_diff = (product.rating - self.profile.average_rating).abs();
        let rating_match = (1.0 - rating_diff / 5.0).max(0.0);

        let purchase_frequency = if weights.total() > 0 {
            category_weight / weights.total() as f64
        } else {
            0.5
        };

        ScoreBreakdown {
            category_match,
            price_match,
            rating_match,
            purchase_frequency,
            recency: RECENCY_SCORE,
        }
    }

    /// Confidence in [0.5, 1.0] that the product suits this user
    pub fn score(&self, product: &ProductFeature) -> f64 {
        let weighted = self.breakdown(product).weighted_sum(&self.weights);
        (MIN_CONFIDENCE + weighted * 0.5).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    /// Confidence adjusted by the relevance label the inference service assigned
    pub fn score_with_relevance(&self, product: &ProductFeature, relevance: Relevance) -> f64 {
        (self.score(product) * relevance.multiplier()).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}
