use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{ProductFeature, PurchaseRecord},
};

/// Every product identifier the user has already bought
pub fn purchased_product_ids(history: &[PurchaseRecord]) -> HashSet<&str> {
    history
        .iter()
        .flat_map(|record| record.product_ids())
        .collect()
}

/// Catalog entries the user has not purchased yet
///
/// An empty catalog is a data-seeding problem and is reported as `NotFound`;
/// an empty result (the user already owns everything) is not an error.
pub fn select_candidates(
    catalog: Vec<ProductFeature>,
    history: &[PurchaseRecord],
) -> AppResult<Vec<ProductFeature>> {
    if catalog.is_empty() {
        return Err(AppError::NotFound(
            "No products available in the catalog".to_string(),
        ));
    }

    let purchased = purchased_product_ids(history);

    Ok(catalog
        .into_iter()
        .filter(|product| !purchased.contains(product.id.as_str()))
        .collect())
}
