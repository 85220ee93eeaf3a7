use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::AppResult,
    models::{ProductFeature, Recommendation},
    services::{CatalogReader, InferenceProvider, PurchaseHistoryReader},
};

pub mod candidates;
pub mod parser;
pub mod profile;
pub mod prompt;
pub mod ranking;
pub mod reasons;
pub mod scoring;

use parser::{AiSuggestion, DecodedReply};
use profile::PreferenceProfile;
use scoring::ConfidenceScorer;

/// Upper bound on recommendations returned per request
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Generates personalized product recommendations
///
/// Combines a user's purchase history with suggestions from a generative
/// inference service. When that service fails or its reply is unusable, a
/// deterministic ranking takes over, so callers only ever see a list
/// (possibly empty) or a catalog/configuration problem.
///
/// Every call rebuilds its profile and candidate list from the stores; the
/// engine keeps no per-request state and never writes.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogReader>,
    history: Arc<dyn PurchaseHistoryReader>,
    inference: Arc<dyn InferenceProvider>,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        history: Arc<dyn PurchaseHistoryReader>,
        inference: Arc<dyn InferenceProvider>,
    ) -> Self {
        Self {
            catalog,
            history,
            inference,
        }
    }

    /// Returns up to five ranked recommendations for the user
    pub async fn generate_recommendations(&self, user_id: &str) -> AppResult<Vec<Recommendation>> {
        let start = Instant::now();

        let history = self.history.fetch_history(user_id).await?;
        let Some(profile) = PreferenceProfile::from_history(&history) else {
            tracing::info!(user_id = %user_id, "No purchase history, nothing to recommend");
            return Ok(Vec::new());
        };

        let catalog = self.catalog.fetch_all_products().await?;
        let candidates = candidates::select_candidates(catalog, &history)?;
        if candidates.is_empty() {
            tracing::info!(user_id = %user_id, "User has purchased every catalog product");
            return Ok(Vec::new());
        }

        tracing::debug!(
            user_id = %user_id,
            categories = profile.categories.len(),
            rated_purchases = profile.rated_purchases,
            average_rating = profile.average_rating,
            "Built preference profile"
        );

        let scorer = ConfidenceScorer::new(&profile);

        let (recommendations, source) = match self.request_suggestions(&profile, &candidates).await {
            Some(suggestions) => (
                ranking::rank_suggestions(&scorer, &suggestions, &candidates),
                "inference",
            ),
            None => (ranking::fallback_rank(&scorer, &candidates), "fallback"),
        };

        tracing::info!(
            user_id = %user_id,
            candidates = candidates.len(),
            recommendations = recommendations.len(),
            source = source,
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Recommendations generated"
        );

        Ok(recommendations)
    }

    /// Asks the inference service for ranked suggestions
    ///
    /// Returns `None` whenever the reply cannot be used: request encoding
    /// failure, transport or upstream error, unparseable text, or no entry
    /// naming a known candidate. There is no retry.
    async fn request_suggestions(
        &self,
        profile: &PreferenceProfile,
        candidates: &[ProductFeature],
    ) -> Option<Vec<AiSuggestion>> {
        let request = match prompt::compose_request(profile, candidates) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to compose inference request");
                return None;
            }
        };

        let reply = match self.inference.infer(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = self.inference.name(),
                    "Inference call failed, using fallback ranking"
                );
                return None;
            }
        };

        match parser::decode_reply(&reply) {
            DecodedReply::Parsed(suggestions) => {
                let received = suggestions.len();
                let valid = parser::validate_suggestions(suggestions, candidates);
                if valid.is_empty() {
                    tracing::warn!(
                        received = received,
                        "Inference reply named no known candidates, using fallback ranking"
                    );
                    return None;
                }
                Some(valid)
            }
            DecodedReply::Unparseable => {
                tracing::warn!(
                    reply_len = reply.len(),
                    "Inference reply could not be parsed, using fallback ranking"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{LineItem, PurchaseRecord},
        services::inference::MockInferenceProvider,
    };
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;

    struct StaticCatalog(Vec<ProductFeature>);

    #[async_trait::async_trait]
    impl CatalogReader for StaticCatalog {
        async fn fetch_all_products(&self) -> AppResult<Vec<ProductFeature>> {
            Ok(self.0.clone())
        }
    }

    struct StaticHistory(Vec<PurchaseRecord>);

    #[async_trait::async_trait]
    impl PurchaseHistoryReader for StaticHistory {
        async fn fetch_history(&self, user_id: &str) -> AppResult<Vec<PurchaseRecord>> {
            Ok(self
                .0
                .iter()
                .filter(|record| record.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    fn line(product_id: &str, category: &str, price: f64, quantity: u32, rating: Option<u8>) -> LineItem {
        LineItem {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            category: category.to_string(),
            price,
            quantity,
            rating,
        }
    }

    /// drinks: 5, snacks: 2, prices 1.00..4.00, average rating 4.0
    fn history() -> Vec<PurchaseRecord> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        vec![
            PurchaseRecord {
                user_id: "alice".to_string(),
                order_id: "o2".to_string(),
                amount: 11.0,
                items: vec![
                    line("h1", "drinks", 4.0, 2, Some(5)),
                    line("h2", "snacks", 1.0, 2, Some(3)),
                ],
                created_at: base + Duration::days(1),
            },
            PurchaseRecord {
                user_id: "alice".to_string(),
                order_id: "o1".to_string(),
                amount: 6.0,
                items: vec![line("h3", "drinks", 2.0, 3, None)],
                created_at: base,
            },
        ]
    }

    fn catalog() -> Vec<ProductFeature> {
        vec![
            ProductFeature::new("h1", "Cold Brew", "drinks", 4.0).with_rating(4.8),
            ProductFeature::new("h2", "Crackers", "snacks", 1.0).with_rating(3.9),
            ProductFeature::new("h3", "Green Tea", "drinks", 2.0).with_rating(4.1),
            ProductFeature::new("c0", "Lemonade", "drinks", 2.5).with_rating(4.5),
            ProductFeature::new("c1", "Iced Tea", "drinks", 3.0).with_rating(4.0),
            ProductFeature::new("c2", "Chips", "snacks", 2.0).with_rating(3.5),
            ProductFeature::new("c3", "Pretzels", "snacks", 3.5).with_rating(4.0),
            ProductFeature::new("c4", "Notebook", "stationery", 9.0).with_rating(1.0),
            ProductFeature::new("c5", "Pen", "stationery", 1.5).with_rating(3.0),
            ProductFeature::new("c6", "Cola", "drinks", 1.0).with_rating(3.0),
            ProductFeature::new("c7", "Candy", "snacks", 6.0).with_rating(5.0),
            ProductFeature::new("c8", "Soap", "household", 2.5).with_rating(4.0),
            ProductFeature::new("c9", "Sparkling Water", "drinks", 4.0).with_rating(4.2),
        ]
    }

    fn engine(
        catalog: Vec<ProductFeature>,
        history: Vec<PurchaseRecord>,
        inference: MockInferenceProvider,
    ) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(StaticCatalog(catalog)),
            Arc::new(StaticHistory(history)),
            Arc::new(inference),
        )
    }

    fn replying(reply: &'static str) -> MockInferenceProvider {
        let mut mock = MockInferenceProvider::new();
        mock.expect_infer()
            .returning(move |_| Ok(reply.to_string()));
        mock.expect_name().return_const("mock");
        mock
    }

    fn failing() -> MockInferenceProvider {
        let mut mock = MockInferenceProvider::new();
        mock.expect_infer()
            .returning(|_| Err(AppError::ExternalApi("timeout".to_string())));
        mock.expect_name().return_const("mock");
        mock
    }

    fn expected_fallback() -> Vec<Recommendation> {
        let history = history();
        let profile = PreferenceProfile::from_history(&history).unwrap();
        let candidates = candidates::select_candidates(catalog(), &history).unwrap();
        ranking::fallback_rank(&ConfidenceScorer::new(&profile), &candidates)
    }

    fn assert_well_formed(recommendations: &[Recommendation]) {
        assert!(recommendations.len() <= MAX_RECOMMENDATIONS);

        let ids: HashSet<&str> = recommendations.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids.len(), recommendations.len());

        for purchased in ["h1", "h2", "h3"] {
            assert!(!ids.contains(purchased));
        }

        for r in recommendations {
            assert!((0.5..=1.0).contains(&r.confidence));
        }
        for pair in recommendations.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[tokio::test]
    async fn test_empty_history_skips_inference() {
        let mut mock = MockInferenceProvider::new();
        mock.expect_infer().never();

        let engine = engine(catalog(), history(), mock);
        let result = engine.generate_recommendations("bob").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_found() {
        let mut mock = MockInferenceProvider::new();
        mock.expect_infer().never();

        let engine = engine(Vec::new(), history(), mock);
        let result = engine.generate_recommendations("alice").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_everything_purchased_is_empty() {
        let mut mock = MockInferenceProvider::new();
        mock.expect_infer().never();

        let owned = catalog().into_iter().filter(|p| p.id.starts_with('h')).collect();
        let engine = engine(owned, history(), mock);
        let result = engine.generate_recommendations("alice").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_inference_error_uses_fallback() {
        let engine = engine(catalog(), history(), failing());
        let result = engine.generate_recommendations("alice").await.unwrap();

        assert_eq!(result, expected_fallback());
        assert_well_formed(&result);
    }

    #[tokio::test]
    async fn test_not_json_reply_uses_fallback() {
        let engine = engine(catalog(), history(), replying("not json"));
        let result = engine.generate_recommendations("alice").await.unwrap();

        assert_eq!(result, expected_fallback());
    }

    #[tokio::test]
    async fn test_reply_with_only_unknown_ids_uses_fallback() {
        let engine = engine(
            catalog(),
            history(),
            replying(r#"[{"productId": "ghost", "relevance": "high"}, {"productId": "h1"}]"#),
        );
        let result = engine.generate_recommendations("alice").await.unwrap();

        assert_eq!(result, expected_fallback());
    }

    #[tokio::test]
    async fn test_two_valid_entries_are_backfilled() {
        let reply = r#"Sure! Here you go:
[
  {"productId": "c8", "relevance": "high", "explanation": "Useful around the house"},
  {"productId": "ghost", "relevance": "high", "explanation": "Does not exist"},
  {"productId": "c2", "relevance": "medium", "explanation": "Goes with your drinks"}
]"#;
        let engine = engine(catalog(), history(), replying(reply));
        let result = engine.generate_recommendations("alice").await.unwrap();

        assert_eq!(result.len(), MAX_RECOMMENDATIONS);
        let ai_ids: HashSet<&str> = result[..2].iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ai_ids, HashSet::from(["c8", "c2"]));
        assert!(result.iter().all(|r| r.product_id != "ghost"));
        assert_well_formed(&result);
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_results() {
        let reply = r#"[{"productId": "c0", "relevance": "high", "explanation": "Favourite category"}]"#;
        let engine = engine(catalog(), history(), replying(reply));

        let first = engine.generate_recommendations("alice").await.unwrap();
        let second = engine.generate_recommendations("alice").await.unwrap();
        assert_eq!(first, second);
        assert_well_formed(&first);
    }
}
