use crate::api::models::health::HealthResponse;
use axum::Json;
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    summary = "Health check",
    description = "Liveness probe. Does not contact the provider.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
#[tracing::instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
    })
}
