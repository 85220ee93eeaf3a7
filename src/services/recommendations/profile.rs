use std::collections::HashMap;

use crate::models::PurchaseRecord;

/// Observed unit-price range across a user's purchases
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::empty()
    }
}

impl PriceRange {
    /// Range that has seen no prices yet: min is +inf, max is 0
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: 0.0,
        }
    }

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    fn include(&mut self, price: f64) {
        self.min = self.min.min(price);
        self.max = self.max.max(price);
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Per-request summary of what a user buys, at what prices, and how they rate it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreferenceProfile {
    /// Category -> accumulated purchased quantity
    pub categories: HashMap<String, u64>,
    pub price_range: PriceRange,
    /// Mean rating over rated line items, 0 when nothing was rated
    pub average_rating: f64,
    /// Number of line items that carried a rating
    pub rated_purchases: u32,
}

impl PreferenceProfile {
    /// Builds a profile from a user's purchase history
    ///
    /// Returns `None` when the history is empty; callers treat that as
    /// "nothing to recommend" rather than an error.
    pub fn from_history(history: &[PurchaseRecord]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }

        let mut profile = Self::default();
        let mut rating_sum = 0.0;

        for item in history.iter().flat_map(|record| record.items.iter()) {
            *profile
                .categories
                .entry(item.category.clone())
                .or_insert(0) += u64::from(item.quantity);

            profile.price_range.include(item.price);

            if let Some(rating) = item.rating {
                rating_sum += f64::from(rating);
                profile.rated_purchases += 1;
            }
        }

        if profile.rated_purchases > 0 {
            profile.average_rating = rating_sum / f64::from(profile.rated_purchases);
        }

        Some(profile)
    }

    /// Categories ordered by accumulated quantity, highest first
    ///
    /// Ties are broken by category name so the ordering is stable across calls.
    pub fn top_categories(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut categories: Vec<(&str, u64)> = self
            .categories
            .iter()
            .map(|(category, quantity)| (category.as_str(), *quantity))
            .collect();

        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        categories.truncate(limit);
        categories
    }
}
