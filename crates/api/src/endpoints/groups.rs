//! Group management endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use peerlink_common::AppResult;
use peerlink_core::envelope::{MessageContent, ReplyMetadata};
use peerlink_core::services::group::{AddMembersInput, AdminAction, CreateGroupInput};
use peerlink_db::entities::group_member::MemberRole;
use peerlink_db::entities::{group, group_member, group_message};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

/// Create groups router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group))
        .route("/users/{user_id}/groups", get(user_groups))
        .route(
            "/groups/{group_id}/members",
            get(list_members).post(add_members),
        )
        .route("/groups/{group_id}/messages", get(recent_messages))
        .route("/groups/{group_id}/admin", post(admin_action))
        .route("/groups/{group_id}/leave", post(leave_group))
}

/// Group record with its derived member count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub member_count: u64,
}

impl GroupResponse {
    fn from_model(model: group::Model, member_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_by: model.created_by,
            created_at: model.created_at.into(),
            avatar_url: model.avatar_url,
            member_count,
        }
    }
}

/// Member record with presence.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub group_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub is_muted: bool,
    pub is_banned: bool,
    /// Identifiers double as display names.
    pub username: String,
    pub is_online: bool,
}

impl MemberResponse {
    fn from_model(model: group_member::Model, is_online: bool) -> Self {
        Self {
            group_id: model.group_id,
            username: model.user_id.clone(),
            user_id: model.user_id,
            role: model.role,
            joined_at: model.joined_at.into(),
            is_muted: model.is_muted,
            is_banned: model.is_banned,
            is_online,
        }
    }
}

/// Stored group message with content re-inflated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageResponse {
    pub id: String,
    pub group_id: String,
    pub from_id: String,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    pub delivered: bool,
    pub read_by: Vec<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyMetadata>,
}

impl From<group_message::Model> for GroupMessageResponse {
    fn from(model: group_message::Model) -> Self {
        let read_by = model.read_by_ids();
        Self {
            id: model.id,
            group_id: model.group_id,
            from_id: model.from_id,
            content: MessageContent::from_stored(&model.content),
            timestamp: model.timestamp.into(),
            delivered: model.delivered,
            read_by,
            status: model.status,
            reply_to: model
                .reply_to
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
        }
    }
}

/// Create a group with initial members.
async fn create_group(
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<Json<GroupResponse>> {
    info!(created_by = %input.created_by, name = %input.name, "creating group");

    let (group, member_count) = state.groups.create(input).await?;
    Ok(Json(GroupResponse::from_model(group, member_count)))
}

/// All groups a user is a non-banned member of.
async fn user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<GroupResponse>>> {
    let groups = state.groups.groups_for_user(&user_id).await?;
    Ok(Json(
        groups
            .into_iter()
            .map(|(group, count)| GroupResponse::from_model(group, count))
            .collect(),
    ))
}

/// Members of a group with their online flag. Banned members are excluded.
async fn list_members(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    let members = state.groups.members_with_presence(&group_id).await?;
    Ok(Json(
        members
            .into_iter()
            .map(|(member, online)| MemberResponse::from_model(member, online))
            .collect(),
    ))
}

/// Query for the group message fetch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessagesQuery {
    pub user_id: String,
}

/// Recent messages of a group in chronological order. Only non-banned
/// members may read.
async fn recent_messages(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<GroupMessagesQuery>,
) -> AppResult<Json<Vec<GroupMessageResponse>>> {
    let messages = state
        .groups
        .recent_messages(&group_id, &query.user_id)
        .await?;
    Ok(Json(
        messages.into_iter().map(GroupMessageResponse::from).collect(),
    ))
}

/// Add members to a group; returns the updated member list.
async fn add_members(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(input): Json<AddMembersInput>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    info!(group = %group_id, added_by = %input.added_by, count = input.user_ids.len(), "adding members");

    let members = state.groups.add_members(&group_id, input).await?;
    Ok(Json(
        members
            .into_iter()
            .map(|(member, online)| MemberResponse::from_model(member, online))
            .collect(),
    ))
}

/// Perform a moderation action; admins only. Echoes the applied action.
async fn admin_action(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(action): Json<AdminAction>,
) -> AppResult<Json<AdminAction>> {
    let applied = state.groups.admin_action(&group_id, action).await?;
    Ok(Json(applied))
}

/// Leave request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub user_id: String,
}

/// Leave acknowledgement.
#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub success: bool,
}

/// Leave a group. The sole remaining admin is refused.
async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(request): Json<LeaveRequest>,
) -> AppResult<Json<LeaveResponse>> {
    info!(group = %group_id, user = %request.user_id, "leaving group");

    state.groups.leave(&group_id, &request.user_id).await?;
    Ok(Json(LeaveResponse { success: true }))
}
