pub mod beaches;
pub mod chat;
pub mod health;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes(state.clone()))
        .merge(chat::routes(state))
        .merge(beaches::routes())
}
