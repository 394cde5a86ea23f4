//! Identifier mint and presence probe.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;

use crate::state::AppState;

/// Create identity router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-id", get(generate_id))
        .route("/status/{id}", get(user_status))
}

/// Generated identifier response.
#[derive(Debug, Serialize)]
pub struct GeneratedId {
    pub id: String,
}

/// Mint a fresh 4-character identifier. Uniqueness is not checked; clients
/// retry on collision.
async fn generate_id(State(state): State<AppState>) -> Json<GeneratedId> {
    Json(GeneratedId {
        id: state.id_gen.endpoint_id(),
    })
}

/// Presence probe response.
#[derive(Debug, Serialize)]
pub struct PresenceStatus {
    pub online: bool,
}

/// Whether an endpoint currently has a live session.
async fn user_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<PresenceStatus> {
    Json(PresenceStatus {
        online: state.registry.is_online(&id).await,
    })
}
