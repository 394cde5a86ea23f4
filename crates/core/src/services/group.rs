//! Group engine: membership, moderation, fan-out, and notifications.

use chrono::{DateTime, Utc};
use peerlink_common::config::RelayConfig;
use peerlink_common::{AppError, AppResult, IdGenerator};
use peerlink_db::entities::group_member::MemberRole;
use peerlink_db::entities::{group, group_member, group_message};
use peerlink_db::repositories::{GroupMessageRepository, GroupRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use validator::Validate;

use crate::envelope::{
    self, ChatEnvelope, GROUP_PREFIX, GroupNotification, NotificationKind, STATUS_DELIVERED,
};
use crate::registry::ConnectionRegistry;

const ERR_NOT_A_MEMBER: &str = "You are not a member of this group";
const ERR_MUTED: &str = "You are muted in this group";

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub initial_members: Vec<String>,
}

/// Input for adding members to an existing group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersInput {
    pub user_ids: Vec<String>,
    pub added_by: String,
}

/// Moderation verbs an admin can apply to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminActionKind {
    Mute,
    Unmute,
    Ban,
    Unban,
    Promote,
    Demote,
}

impl AdminActionKind {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }
}

/// A moderation request performed by a group admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    #[serde(rename = "type")]
    pub kind: AdminActionKind,
    #[serde(default)]
    pub group_id: String,
    pub target_user_id: String,
    pub performed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Group membership, moderation, and fan-out engine.
#[derive(Clone)]
pub struct GroupService {
    groups: GroupRepository,
    group_messages: GroupMessageRepository,
    registry: ConnectionRegistry,
    id_gen: IdGenerator,
    sync_messages: u64,
    fetch_messages: u64,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub fn new(
        groups: GroupRepository,
        group_messages: GroupMessageRepository,
        registry: ConnectionRegistry,
        relay: &RelayConfig,
    ) -> Self {
        Self {
            groups,
            group_messages,
            registry,
            id_gen: IdGenerator::new(),
            sync_messages: relay.sync_messages,
            fetch_messages: relay.fetch_messages,
        }
    }

    // ==================== Group Operations ====================

    /// Create a group with the creator as admin plus the deduplicated
    /// initial members, in one transaction. Everyone involved is notified.
    pub async fn create(&self, input: CreateGroupInput) -> AppResult<(group::Model, u64)> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let group_id = format!("{GROUP_PREFIX}{}", self.id_gen.short_id());
        let now = Utc::now();

        let group_row = group::ActiveModel {
            id: Set(group_id.clone()),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            created_by: Set(input.created_by.clone()),
            created_at: Set(now.into()),
            avatar_url: Set(None),
        };

        let mut member_ids = vec![input.created_by.clone()];
        let mut member_rows = vec![member_row(&group_id, &input.created_by, MemberRole::Admin, now)];
        for user_id in &input.initial_members {
            if user_id.is_empty() || member_ids.iter().any(|m| m == user_id) {
                continue;
            }
            member_ids.push(user_id.clone());
            member_rows.push(member_row(&group_id, user_id, MemberRole::Member, now));
        }

        let created = self.groups.create_with_members(group_row, member_rows).await?;
        let member_count = self.groups.count_members(&group_id).await?;

        info!(group = %group_id, created_by = %input.created_by, members = member_count, "group created");

        for member_id in &member_ids {
            let notification = self.notification(
                &group_id,
                NotificationKind::MemberAdded,
                format!("You were added to group '{}'", input.name),
                Some(json!({
                    "userId": member_id,
                    "groupName": input.name,
                    "groupId": group_id,
                })),
            );
            self.notify_user(member_id, &notification).await;
        }

        let notification = self.notification(
            &group_id,
            NotificationKind::GroupCreated,
            "Group created".to_owned(),
            None,
        );
        self.notify_members(&group_id, &notification).await?;

        Ok((created, member_count))
    }

    /// Groups a user belongs to, with derived member counts.
    pub async fn groups_for_user(&self, user_id: &str) -> AppResult<Vec<(group::Model, u64)>> {
        self.groups.groups_for_user(user_id).await
    }

    /// Members of a group (banned excluded) with their presence flag.
    pub async fn members_with_presence(
        &self,
        group_id: &str,
    ) -> AppResult<Vec<(group_member::Model, bool)>> {
        // 404 for unknown groups rather than an empty list.
        self.groups.get_by_id(group_id).await?;

        let members = self.groups.list_members(group_id).await?;
        let mut result = Vec::with_capacity(members.len());
        for member in members {
            let online = self.registry.is_online(&member.user_id).await;
            result.push((member, online));
        }

        Ok(result)
    }

    /// The latest stored messages of a group in chronological order.
    /// Authorized only for non-banned members.
    pub async fn recent_messages(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<group_message::Model>> {
        let member = self.groups.get_member(group_id, user_id).await?;
        if !member.is_some_and(|m| !m.is_banned) {
            return Err(AppError::Forbidden("Not a member".to_owned()));
        }

        let mut messages = self
            .group_messages
            .latest_for_group(group_id, self.fetch_messages)
            .await?;
        messages.reverse();
        Ok(messages)
    }

    // ==================== Member Operations ====================

    /// Add members to a group. Any non-banned member may add; duplicates are
    /// ignored. Returns the updated member list with presence.
    pub async fn add_members(
        &self,
        group_id: &str,
        input: AddMembersInput,
    ) -> AppResult<Vec<(group_member::Model, bool)>> {
        let performer = self.groups.get_member(group_id, &input.added_by).await?;
        if !performer.is_some_and(|m| !m.is_banned) {
            return Err(AppError::Forbidden("Not a member of this group".to_owned()));
        }

        let group = self.groups.get_by_id(group_id).await?;
        let now = Utc::now();

        for user_id in &input.user_ids {
            if user_id.is_empty() {
                continue;
            }

            let added = self
                .groups
                .add_member(member_row(group_id, user_id, MemberRole::Member, now))
                .await?;
            if !added {
                continue;
            }

            let personal = self.notification(
                group_id,
                NotificationKind::MemberAdded,
                format!("You were added to group '{}'", group.name),
                Some(json!({
                    "userId": user_id,
                    "groupName": group.name,
                    "addedBy": input.added_by,
                })),
            );
            self.notify_user(user_id, &personal).await;

            let broadcast = self.notification(
                group_id,
                NotificationKind::MemberAdded,
                format!("{user_id} was added to the group"),
                Some(json!({ "userId": user_id })),
            );
            self.notify_members(group_id, &broadcast).await?;
        }

        self.members_with_presence(group_id).await
    }

    /// Apply a moderation action. The performer must currently hold admin in
    /// the group (and not be banned).
    pub async fn admin_action(&self, group_id: &str, action: AdminAction) -> AppResult<AdminAction> {
        let performer = self.groups.get_member(group_id, &action.performed_by).await?;
        if !performer.is_some_and(|m| m.role.is_admin() && !m.is_banned) {
            return Err(AppError::Forbidden("Not authorized".to_owned()));
        }

        let target = &action.target_user_id;
        match action.kind {
            AdminActionKind::Mute => self.groups.set_muted(group_id, target, true).await?,
            AdminActionKind::Unmute => self.groups.set_muted(group_id, target, false).await?,
            AdminActionKind::Ban => {
                self.groups.set_banned(group_id, target, true).await?;
                // One disconnect on the transition; the session stays open.
                self.registry
                    .send(target, &envelope::group_disconnect_frame(group_id, "banned"))
                    .await;
            }
            AdminActionKind::Unban => self.groups.set_banned(group_id, target, false).await?,
            AdminActionKind::Promote => {
                self.groups.set_role(group_id, target, MemberRole::Admin).await?;
            }
            AdminActionKind::Demote => {
                let member = self.groups.get_member(group_id, target).await?;
                if member.is_some_and(|m| m.role.is_admin())
                    && self.groups.count_admins(group_id).await? <= 1
                {
                    return Err(AppError::BadRequest(
                        "Cannot demote: this member is the only admin".to_owned(),
                    ));
                }
                self.groups.set_role(group_id, target, MemberRole::Member).await?;
            }
        }

        info!(group = %group_id, action = action.kind.as_str(), target = %target, by = %action.performed_by, "admin action applied");

        let notification = self.notification(
            group_id,
            NotificationKind::AdminAction,
            format!("{} {}", action.kind.as_str(), target),
            Some(json!({ "action": action.kind.as_str(), "userId": target })),
        );
        self.notify_members(group_id, &notification).await?;

        Ok(action)
    }

    /// Remove a user from a group. The sole remaining admin cannot leave.
    pub async fn leave(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        let member = self.groups.get_member(group_id, user_id).await?;
        if member.is_some_and(|m| m.role.is_admin())
            && self.groups.count_admins(group_id).await? <= 1
        {
            return Err(AppError::BadRequest(
                "Cannot leave the group: you are the only admin".to_owned(),
            ));
        }

        self.groups.remove_member(group_id, user_id).await?;

        let notification = self.notification(
            group_id,
            NotificationKind::MemberLeft,
            format!("{user_id} left the group"),
            Some(json!({ "userId": user_id })),
        );
        self.notify_members(group_id, &notification).await?;

        Ok(())
    }

    // ==================== Fan-out ====================

    /// Handle a chat envelope addressed to a group: gate on membership and
    /// moderation state, persist, then fan out to every non-banned member
    /// currently online.
    pub async fn handle_message(&self, mut envelope: ChatEnvelope) -> AppResult<()> {
        envelope.fill_defaults();
        let group_id = envelope.to_id.clone();

        let member = self.groups.get_member(&group_id, &envelope.from_id).await?;
        let rejection = match &member {
            None => Some(ERR_NOT_A_MEMBER),
            Some(m) if m.is_banned => Some(ERR_NOT_A_MEMBER),
            Some(m) if m.is_muted => Some(ERR_MUTED),
            Some(_) => None,
        };
        if let Some(text) = rejection {
            debug!(group = %group_id, from = %envelope.from_id, reason = text, "group send rejected");
            self.registry
                .send(
                    &envelope.from_id,
                    &envelope::system_error(&envelope.id, &envelope.from_id, text),
                )
                .await;
            return Ok(());
        }

        let record = group_message::ActiveModel {
            id: Set(envelope.id.clone()),
            group_id: Set(group_id.clone()),
            from_id: Set(envelope.from_id.clone()),
            content: Set(envelope.content.canonical_string()),
            timestamp: Set(envelope.timestamp.unwrap_or_else(Utc::now).into()),
            delivered: Set(true),
            read_by: Set(
                serde_json::to_string(&[envelope.from_id.as_str()]).unwrap_or_default(),
            ),
            status: Set(envelope.status.clone()),
            reply_to: Set(envelope
                .reply_to
                .as_ref()
                .map(|reply| serde_json::to_string(reply).unwrap_or_default())),
        };
        self.group_messages.insert(record).await?;

        for member_id in self.groups.member_ids(&group_id).await? {
            let frame = ChatEnvelope {
                id: envelope.id.clone(),
                from_id: envelope.from_id.clone(),
                to_id: group_id.clone(),
                content: envelope.content.clone(),
                timestamp: envelope.timestamp,
                delivered: true,
                read_status: member_id == envelope.from_id,
                status: STATUS_DELIVERED.to_owned(),
                reply_to: envelope.reply_to.clone(),
            };
            self.registry.send(&member_id, &frame).await;
        }

        Ok(())
    }

    /// Replay the latest group messages for each of the user's non-banned
    /// memberships, chronologically, framed as chat envelopes.
    pub async fn sync_for_user(&self, user_id: &str) -> AppResult<()> {
        for group_id in self.groups.group_ids_for_user(user_id).await? {
            let mut backlog = self
                .group_messages
                .latest_for_group(&group_id, self.sync_messages)
                .await?;
            backlog.reverse();

            for record in backlog {
                let frame = ChatEnvelope::from_group_record(record, user_id);
                if !self.registry.send(user_id, &frame).await {
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    // ==================== Notification Helpers ====================

    fn notification(
        &self,
        group_id: &str,
        kind: NotificationKind,
        message: String,
        metadata: Option<serde_json::Value>,
    ) -> GroupNotification {
        GroupNotification {
            id: self.id_gen.short_id(),
            group_id: group_id.to_owned(),
            kind,
            message,
            timestamp: Utc::now(),
            metadata,
        }
    }

    async fn notify_user(&self, user_id: &str, notification: &GroupNotification) {
        if !self
            .registry
            .send(user_id, &envelope::group_notification_frame(notification))
            .await
        {
            debug!(user = %user_id, "offline, notification skipped");
        }
    }

    async fn notify_members(
        &self,
        group_id: &str,
        notification: &GroupNotification,
    ) -> AppResult<()> {
        let frame = envelope::group_notification_frame(notification);
        for member_id in self.groups.member_ids(group_id).await? {
            self.registry.send(&member_id, &frame).await;
        }
        Ok(())
    }
}

fn member_row(
    group_id: &str,
    user_id: &str,
    role: MemberRole,
    joined_at: DateTime<Utc>,
) -> group_member::ActiveModel {
    group_member::ActiveModel {
        group_id: Set(group_id.to_owned()),
        user_id: Set(user_id.to_owned()),
        role: Set(role),
        joined_at: Set(joined_at.into()),
        is_muted: Set(false),
        is_banned: Set(false),
    }
}
