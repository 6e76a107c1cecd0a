use crate::state::AppState;
use axum::Router;

pub mod api_key;
mod dto;
pub mod handlers;
pub mod password;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::dashboard_routes())
}
