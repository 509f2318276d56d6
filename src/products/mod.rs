use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod repo;
mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
