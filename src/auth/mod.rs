use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod mail;
mod password;
pub mod tokens;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
