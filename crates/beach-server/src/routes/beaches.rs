use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use beach::catalog;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Reference data for one beach, looked up by display or short name
async fn beach_info(Path(name): Path<String>) -> impl IntoResponse {
    match catalog::lookup(&name) {
        Some(beach) => (StatusCode::OK, Json(beach)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No information available for '{}'", name),
            }),
        )
            .into_response(),
    }
}

pub fn routes() -> Router {
    Router::new().route("/api/v1/beaches/:name", get(beach_info))
}
