//! Direct-message history endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use peerlink_common::AppResult;
use peerlink_core::envelope::ChatEnvelope;
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

/// Create messages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/{user_id}", get(history))
        .route("/messages/{user_id}/{contact_id}", delete(purge))
}

/// Full direct-message history for a user, ascending by timestamp, with
/// structured content re-inflated.
async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<ChatEnvelope>>> {
    let messages = state.routing.history(&user_id).await?;
    Ok(Json(messages))
}

/// Purge acknowledgement.
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub success: bool,
}

/// Delete the conversation between two users, both directions, atomically.
async fn purge(
    State(state): State<AppState>,
    Path((user_id, contact_id)): Path<(String, String)>,
) -> AppResult<Json<PurgeResponse>> {
    info!(user = %user_id, contact = %contact_id, "purging conversation");

    state.routing.purge(&user_id, &contact_id).await?;
    Ok(Json(PurgeResponse { success: true }))
}
