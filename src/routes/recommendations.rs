use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::RecommendationResponse,
    routes::AppState,
};

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> AppResult<Json<RecommendationResponse>> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("User ID is required".to_string()));
    }

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        "Processing recommendation request"
    );

    let recommendations = state.engine.generate_recommendations(user_id).await?;

    tracing::info!(
        request_id = %request_id,
        count = recommendations.len(),
        "Recommendation request completed"
    );

    Ok(Json(RecommendationResponse::from(recommendations)))
}
