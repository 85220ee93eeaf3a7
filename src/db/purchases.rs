use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{LineItem, PurchaseRecord},
    services::PurchaseHistoryReader,
};

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    user_id: String,
    order_id: String,
    amount: f64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    history_id: i64,
    product_id: String,
    name: String,
    category: String,
    price: f64,
    quantity: i32,
    rating: Option<i16>,
}

impl ItemRow {
    /// Converts a stored row into a line item, skipping rows that cannot be trusted
    fn into_line_item(self) -> Option<LineItem> {
        let Ok(quantity) = u32::try_from(self.quantity) else {
            tracing::warn!(
                history_id = self.history_id,
                product_id = %self.product_id,
                quantity = self.quantity,
                "Skipping purchase item with negative quantity"
            );
            return None;
        };

        let rating = self.rating.and_then(|r| match u8::try_from(r) {
            Ok(r @ 1..=5) => Some(r),
            _ => {
                tracing::debug!(
                    product_id = %self.product_id,
                    rating = r,
                    "Ignoring out-of-range purchase rating"
                );
                None
            }
        });

        Some(LineItem {
            product_id: self.product_id,
            name: self.name,
            category: self.category,
            price: self.price,
            quantity,
            rating,
        })
    }
}

/// Groups item rows under their history rows, preserving history order
fn assemble_records(histories: Vec<HistoryRow>, items: Vec<ItemRow>) -> Vec<PurchaseRecord> {
    let mut items_by_history: HashMap<i64, Vec<LineItem>> = HashMap::new();
    for row in items {
        let history_id = row.history_id;
        if let Some(item) = row.into_line_item() {
            items_by_history.entry(history_id).or_default().push(item);
        }
    }

    histories
        .into_iter()
        .map(|history| PurchaseRecord {
            items: items_by_history.remove(&history.id).unwrap_or_default(),
            user_id: history.user_id,
            order_id: history.order_id,
            amount: history.amount,
            created_at: history.created_at,
        })
        .collect()
}

/// Reads finalized purchase histories from PostgreSQL
#[derive(Clone)]
pub struct PgPurchaseHistory {
    pool: PgPool,
}

impl PgPurchaseHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PurchaseHistoryReader for PgPurchaseHistory {
    async fn fetch_history(&self, user_id: &str) -> AppResult<Vec<PurchaseRecord>> {
        let histories = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, user_id, order_id, amount::float8 AS amount, created_at
            FROM purchase_histories
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if histories.is_empty() {
            return Ok(Vec::new());
        }

        let history_ids: Vec<i64> = histories.iter().map(|h| h.id).collect();

        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT history_id, product_id, name, category, price::float8 AS price, quantity, rating
            FROM purchase_items
            WHERE history_id = ANY($1)
            ORDER BY history_id, position
            "#,
        )
        .bind(&history_ids)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            user_id = %user_id,
            orders = histories.len(),
            items = items.len(),
            "Purchase history loaded"
        );

        Ok(assemble_records(histories, items))
    }
}
