//! Control-plane endpoints.

mod groups;
mod identity;
mod messages;

use axum::Router;

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(identity::router())
        .merge(messages::router())
        .merge(groups::router())
}
