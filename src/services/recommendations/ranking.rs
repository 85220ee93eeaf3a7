use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{ProductFeature, Recommendation};

use super::parser::AiSuggestion;
use super::reasons::reasons_with_explanation;
use super::scoring::ConfidenceScorer;
use super::MAX_RECOMMENDATIONS;

fn recommend(
    scorer: &ConfidenceScorer<'_>,
    product: &ProductFeature,
    confidence: f64,
    explanation: Option<&str>,
) -> Recommendation {
    let reasons = reasons_with_explanation(
        product,
        scorer.profile(),
        scorer.category_weights(),
        explanation,
    );
    Recommendation::from_product(product, confidence, reasons)
}

/// Confidence descending, then heavier category first
fn by_confidence_then_weight(a: &(u64, Recommendation), b: &(u64, Recommendation)) -> Ordering {
    b.1.confidence
        .total_cmp(&a.1.confidence)
        .then_with(|| b.0.cmp(&a.0))
}

/// Deterministic ranking used when the inference service is unusable
///
/// Only candidates from categories the user already buys, priced inside the
/// observed range, are eligible. Ties on confidence go to the heavier category.
pub fn fallback_rank(
    scorer: &ConfidenceScorer<'_>,
    candidates: &[ProductFeature],
) -> Vec<Recommendation> {
    let range = scorer.profile().price_range;

    let mut ranked: Vec<(u64, Recommendation)> = candidates
        .iter()
        .filter(|product| scorer.category_weight(product) > 0 && range.contains(product.price))
        .map(|product| {
            (
                scorer.category_weight(product),
                recommend(scorer, product, scorer.score(product), None),
            )
        })
        .collect();

    ranked.sort_by(by_confidence_then_weight);

    ranked
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(_, recommendation)| recommendation)
        .collect()
}

/// Ranks validated suggestions from the inference service and backfills to the cap
///
/// Suggestions must already be restricted to known, distinct candidates.
pub fn rank_suggestions(
    scorer: &ConfidenceScorer<'_>,
    suggestions: &[AiSuggestion],
    candidates: &[ProductFeature],
) -> Vec<Recommendation> {
    let by_id: HashMap<&str, &ProductFeature> =
        candidates.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut ranked: Vec<Recommendation> = suggestions
        .iter()
        .filter_map(|suggestion| {
            let product = by_id.get(suggestion.product_id.as_str())?;
            let confidence = scorer.score_with_relevance(product, suggestion.relevance);
            Some(recommend(
                scorer,
                product,
                confidence,
                suggestion.explanation.as_deref(),
            ))
        })
        .collect();

    // Stable sort keeps the service's own ordering among equal confidences
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(MAX_RECOMMENDATIONS);

    let needed = MAX_RECOMMENDATIONS - ranked.len();
    if needed > 0 {
        let selected: HashSet<&str> = ranked.iter().map(|r| r.product_id.as_str()).collect();
        let ceiling = ranked.last().map(|r| r.confidence);
        let extra = backfill(scorer, candidates, &selected, needed, ceiling);
        ranked.extend(extra);
    }

    ranked
}

/// Scores candidates the inference service did not pick and returns the best `needed`
///
/// Backfilled entries rank below every AI-backed entry, so their reported
/// confidence is capped at `ceiling`; selection still uses the raw score.
pub fn backfill(
    scorer: &ConfidenceScorer<'_>,
    candidates: &[ProductFeature],
    selected: &HashSet<&str>,
    needed: usize,
    ceiling: Option<f64>,
) -> Vec<Recommendation> {
    let mut extra: Vec<Recommendation> = candidates
        .iter()
        .filter(|product| !selected.contains(product.id.as_str()))
        .map(|product| recommend(scorer, product, scorer.score(product), None))
        .collect();

    extra.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    extra.truncate(needed);

    if let Some(ceiling) = ceiling {
        for recommendation in &mut extra {
            recommendation.confidence = recommendation.confidence.min(ceiling);
        }
    }

    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::recommendations::parser::Relevance;
    use crate::services::recommendations::profile::{PreferenceProfile, PriceRange};

    fn profile() -> PreferenceProfile {
        PreferenceProfile {
            categories: HashMap::from([("drinks".to_string(), 5), ("snacks".to_string(), 2)]),
            price_range: PriceRange::new(1.0, 4.0),
            average_rating: 4.0,
            rated_purchases: 3,
        }
    }

    fn suggestion(id: &str, relevance: Relevance) -> AiSuggestion {
        AiSuggestion {
            product_id: id.to_string(),
            relevance,
            explanation: Some(format!("AI likes {}", id)),
        }
    }

    fn ten_candidates() -> Vec<ProductFeature> {
        vec![
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

    fn assert_sorted_desc(recommendations: &[Recommendation]) {
        for pair in recommendations.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_fallback_filters_by_category_and_price() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);

        let ranked = fallback_rank(&scorer, &ten_candidates());
        let ids: HashSet<&str> = ranked.iter().map(|r| r.product_id.as_str()).collect();

        assert_eq!(ranked.len(), MAX_RECOMMENDATIONS);
        // stationery, household and the out-of-range candy never qualify
        for excluded in ["c4", "c5", "c7", "c8"] {
            assert!(!ids.contains(excluded));
        }
        assert_sorted_desc(&ranked);
    }

    #[test]
    fn test_fallback_breaks_ties_by_category_weight() {
        let rec = |id: &str, category: &str, confidence: f64| {
            Recommendation::from_product(
                &ProductFeature::new(id, id, category, 2.0),
                confidence,
                Vec::new(),
            )
        };
        let best = (1, rec("best", "bakery", 0.9));
        let heavy = (5, rec("heavy", "drinks", 0.7));
        let light = (2, rec("light", "snacks", 0.7));

        for mut ranked in [
            vec![light.clone(), heavy.clone(), best.clone()],
            vec![heavy.clone(), best.clone(), light.clone()],
            vec![best.clone(), light.clone(), heavy.clone()],
        ] {
            ranked.sort_by(by_confidence_then_weight);
            let ids: Vec<&str> = ranked.iter().map(|(_, r)| r.product_id.as_str()).collect();
            assert_eq!(ids, vec!["best", "heavy", "light"]);
        }
    }

    #[test]
    fn test_fallback_equal_weights_score_equally() {
        let profile = PreferenceProfile {
            categories: HashMap::from([("drinks".to_string(), 3), ("snacks".to_string(), 3)]),
            price_range: PriceRange::new(1.0, 3.0),
            average_rating: 0.0,
            rated_purchases: 0,
        };
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = vec![
            ProductFeature::new("s", "Chips", "snacks", 2.0),
            ProductFeature::new("d", "Soda", "drinks", 2.0),
        ];

        let ranked = fallback_rank(&scorer, &candidates);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].confidence, ranked[1].confidence);
    }

    #[test]
    fn test_fallback_without_eligible_candidates_is_empty() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = vec![ProductFeature::new("x", "Notebook", "stationery", 2.0)];

        assert!(fallback_rank(&scorer, &candidates).is_empty());
    }

    #[test]
    fn test_two_suggestions_are_backfilled_to_five() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = ten_candidates();
        let suggestions = vec![
            suggestion("c4", Relevance::High),
            suggestion("c8", Relevance::Medium),
        ];

        let ranked = rank_suggestions(&scorer, &suggestions, &candidates);
        assert_eq!(ranked.len(), MAX_RECOMMENDATIONS);

        let ai_ids: HashSet<&str> = ranked[..2].iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ai_ids, HashSet::from(["c4", "c8"]));

        // AI-backed entries keep their explanation as the final reason
        assert!(ranked[..2]
            .iter()
            .all(|r| r.reasons.last().unwrap().starts_with("AI likes")));

        // backfill picks the best raw scores among the remaining eight
        let mut remaining: Vec<(&str, f64)> = candidates
            .iter()
            .filter(|p| !ai_ids.contains(p.id.as_str()))
            .map(|p| (p.id.as_str(), scorer.score(p)))
            .collect();
        remaining.sort_by(|a, b| b.1.total_cmp(&a.1));
        let expected: Vec<&str> = remaining.iter().take(3).map(|(id, _)| *id).collect();
        let backfilled: Vec<&str> = ranked[2..].iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(backfilled, expected);

        assert_sorted_desc(&ranked);
    }

    #[test]
    fn test_suggestion_confidence_uses_relevance_multiplier() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = ten_candidates();
        let suggestions = vec![suggestion("c2", Relevance::Low)];

        let ranked = rank_suggestions(&scorer, &suggestions, &candidates);
        let expected = (scorer.score(&candidates[2]) * 0.8).clamp(0.5, 1.0);
        assert_eq!(ranked[0].product_id, "c2");
        assert!((ranked[0].confidence - expected).abs() < 1e-12);
    }

    #[test]
    fn test_five_suggestions_need_no_backfill() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = ten_candidates();
        let suggestions: Vec<AiSuggestion> = ["c0", "c1", "c2", "c3", "c9", "c6"]
            .iter()
            .map(|id| suggestion(id, Relevance::Medium))
            .collect();

        let ranked = rank_suggestions(&scorer, &suggestions, &candidates);
        assert_eq!(ranked.len(), MAX_RECOMMENDATIONS);
        assert!(ranked.iter().all(|r| r.reasons.last().unwrap().starts_with("AI likes")));
        assert_sorted_desc(&ranked);
    }

    #[test]
    fn test_backfill_skips_selected_and_respects_ceiling() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = ten_candidates();
        let selected = HashSet::from(["c0"]);

        let extra = backfill(&scorer, &candidates, &selected, 3, Some(0.6));
        assert_eq!(extra.len(), 3);
        assert!(extra.iter().all(|r| r.product_id != "c0"));
        assert!(extra.iter().all(|r| r.confidence <= 0.6 && r.confidence >= 0.5));
    }

    #[test]
    fn test_capped_backfill_keeps_raw_score_order() {
        let profile = profile();
        let scorer = ConfidenceScorer::new(&profile);
        let candidates = ten_candidates();
        let suggestions = vec![suggestion("c4", Relevance::Low)];

        let ranked = rank_suggestions(&scorer, &suggestions, &candidates);
        assert_eq!(ranked[0].product_id, "c4");
        let ceiling = ranked[0].confidence;

        // every backfilled entry is capped, yet selection order follows the raw score
        assert!(ranked[1..].iter().all(|r| r.confidence == ceiling));
        let by_id: HashMap<&str, &ProductFeature> =
            candidates.iter().map(|p| (p.id.as_str(), p)).collect();
        let raw: Vec<f64> = ranked[1..]
            .iter()
            .map(|r| scorer.score(by_id[r.product_id.as_str()]))
            .collect();
        assert!(raw.windows(2).all(|w| w[0] >= w[1]));
        assert!(raw.iter().all(|score| *score >= ceiling));
    }
}
