use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
struct ChatRequest {
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatResponse {
    message: String,
    session_id: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> impl IntoResponse {
    let (session_id, agent) = match state.session(request.session_id).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = ?e, "failed to start conversation");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to start conversation".to_string(),
                }),
            )
                .into_response();
        }
    };

    // One turn at a time per conversation
    let outcome = agent.lock().await.process_turn(&request.message).await;
    tracing::info!(session_id = %session_id, route = ?outcome.route, "chat reply");

    (
        StatusCode::OK,
        Json(ChatResponse {
            message: outcome.reply,
            session_id,
        }),
    )
        .into_response()
}

async fn clear(State(state): State<AppState>, Path(session_id): Path<String>) -> StatusCode {
    if state.remove_session(&session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/chat/:session_id", delete(clear))
        .with_state(state)
}
