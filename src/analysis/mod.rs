pub mod dto;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod normalize;
pub mod schema;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::router()
}
