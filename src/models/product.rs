use serde::{Deserialize, Serialize};

/// A catalog product that can be recommended
///
/// Read-only to the recommendation engine; rows come straight from the
/// `products` table (see `db::catalog`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ProductFeature {
    /// Unique identifier for the product
    pub id: String,
    pub name: String,
    pub category: String,
    /// Unit price, never negative
    pub price: f64,
    /// Average customer rating between 0 and 5
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl ProductFeature {
    /// Creates an unrated product without tags or description
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            price,
            rating: 0.0,
            tags: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
