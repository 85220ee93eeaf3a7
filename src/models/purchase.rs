use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One product line within a historical order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub category: String,
    /// Unit price paid
    pub price: f64,
    pub quantity: u32,
    /// Customer rating between 1 and 5, if the customer left one
    #[serde(default)]
    pub rating: Option<u8>,
}

/// A finalized order from a user's purchase history
///
/// Immutable once written. The engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub user_id: String,
    pub order_id: String,
    /// Total order amount
    pub amount: f64,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// Iterates over the product identifiers in this order
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.product_id.as_str())
    }
}
