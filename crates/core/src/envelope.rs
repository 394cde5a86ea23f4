//! Wire envelopes for the duplex channel.
//!
//! Every frame is a single JSON object with camelCase keys. A `messageType`
//! discriminator, when present, selects a non-chat kind; its absence means a
//! chat or receipt envelope.

use chrono::{DateTime, Utc};
use peerlink_db::entities::{group_message, message};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Group endpoint identifiers carry this fixed prefix.
pub const GROUP_PREFIX: &str = "GROUP_";

/// Sender id used on server-generated error envelopes.
pub const SYSTEM_ID: &str = "system";

/// Reserved control string: delivery acknowledgement.
pub const CONTENT_DELIVERED: &str = "delivered";
/// Reserved control string: read acknowledgement.
pub const CONTENT_READ: &str = "read";
/// Reserved control string: presence broadcast.
pub const CONTENT_STATUS_UPDATE: &str = "status_update";

/// Lifecycle stage: accepted from the sender.
pub const STATUS_SENT: &str = "sent";
/// Lifecycle stage: reached the recipient's session.
pub const STATUS_DELIVERED: &str = "delivered";
/// Lifecycle stage: acknowledged by the recipient.
pub const STATUS_READ: &str = "read";
/// Presence value carried on online broadcasts.
pub const STATUS_ONLINE: &str = "online";
/// Presence value carried on offline broadcasts.
pub const STATUS_OFFLINE: &str = "offline";

pub const KIND_SIGNALING: &str = "webrtc_signaling";
pub const KIND_GROUP_NOTIFICATION: &str = "group_notification";
pub const KIND_GROUP_DISCONNECT: &str = "group_disconnect";

/// File-level metadata attached to structured content. Never the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

/// Structured message content: a typed payload with an optional text body
/// and optional file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredContent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
}

/// The polymorphic `content` field: a plain string or a structured object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(StructuredContent),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// The string compared against the reserved control values. Structured
    /// content exposes its text body.
    #[must_use]
    pub fn control_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Structured(content) => content.text.as_deref().unwrap_or(""),
        }
    }

    /// Whether this content is one of the receipt control strings.
    #[must_use]
    pub fn is_receipt(&self) -> bool {
        matches!(self.control_str(), CONTENT_DELIVERED | CONTENT_READ)
    }

    /// Canonical persisted form: strings pass through, structured content
    /// becomes its JSON serialization.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(content) => serde_json::to_string(content).unwrap_or_default(),
        }
    }

    /// Re-inflate a persisted string: JSON objects matching the structured
    /// shape become structured content again, everything else is plain text.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        if raw.starts_with('{') {
            if let Ok(structured) = serde_json::from_str::<StructuredContent>(raw) {
                return Self::Structured(structured);
            }
        }
        Self::Text(raw.to_string())
    }
}

/// Quoted-message metadata carried on replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    pub message_id: String,
    pub from_id: String,
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A chat or receipt frame. Presence broadcasts reuse this shape with the
/// `status_update` control content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatEnvelope {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub delivered: bool,
    pub read_status: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyMetadata>,
}

impl ChatEnvelope {
    /// Fill server-side defaults: the current instant for a missing or zero
    /// timestamp, `sent` for an empty status. Instants at or before the
    /// epoch count as unset.
    pub fn fill_defaults(&mut self) {
        if self.timestamp.map_or(true, |t| t.timestamp_millis() <= 0) {
            self.timestamp = Some(Utc::now());
        }
        if self.status.is_empty() {
            self.status = STATUS_SENT.to_owned();
        }
    }

    /// Whether the addressee is a group endpoint.
    #[must_use]
    pub fn is_group_addressed(&self) -> bool {
        self.to_id.starts_with(GROUP_PREFIX)
    }

    /// Persisted form of the envelope.
    #[must_use]
    pub fn to_record(&self) -> message::ActiveModel {
        message::ActiveModel {
            id: Set(self.id.clone()),
            from_id: Set(self.from_id.clone()),
            to_id: Set(self.to_id.clone()),
            content: Set(self.content.canonical_string()),
            timestamp: Set(self.timestamp.unwrap_or_else(Utc::now).into()),
            delivered: Set(self.delivered),
            read_status: Set(self.read_status),
            status: Set(if self.status.is_empty() {
                STATUS_SENT.to_owned()
            } else {
                self.status.clone()
            }),
            reply_to: Set(self
                .reply_to
                .as_ref()
                .map(|reply| serde_json::to_string(reply).unwrap_or_default())),
        }
    }

    /// Rebuild an envelope from a stored row, re-inflating content and
    /// reply metadata.
    #[must_use]
    pub fn from_record(record: message::Model) -> Self {
        Self {
            id: record.id,
            from_id: record.from_id,
            to_id: record.to_id,
            content: MessageContent::from_stored(&record.content),
            timestamp: Some(record.timestamp.into()),
            delivered: record.delivered,
            read_status: record.read_status,
            status: record.status,
            reply_to: record
                .reply_to
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
        }
    }

    /// Frame a stored group message for a particular viewer. The group id
    /// goes in `toId`; `readStatus` reflects the viewer's entry in `readBy`.
    #[must_use]
    pub fn from_group_record(record: group_message::Model, viewer: &str) -> Self {
        let read_status = record.read_by_user(viewer);
        Self {
            id: record.id,
            from_id: record.from_id,
            to_id: record.group_id,
            content: MessageContent::from_stored(&record.content),
            timestamp: Some(record.timestamp.into()),
            delivered: true,
            read_status,
            status: record.status,
            reply_to: record
                .reply_to
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
        }
    }
}

/// Synthesized delivery acknowledgement from `recipient` back to `sender`.
#[must_use]
pub fn delivery_receipt(original_id: &str, recipient: &str, sender: &str) -> ChatEnvelope {
    ChatEnvelope {
        id: format!("delivery_{original_id}"),
        from_id: recipient.to_owned(),
        to_id: sender.to_owned(),
        content: MessageContent::Text(CONTENT_DELIVERED.to_owned()),
        timestamp: Some(Utc::now()),
        delivered: true,
        read_status: false,
        status: STATUS_DELIVERED.to_owned(),
        reply_to: None,
    }
}

/// Presence broadcast for a user coming online or going offline.
#[must_use]
pub fn presence_envelope(user_id: &str, online: bool) -> ChatEnvelope {
    ChatEnvelope {
        id: format!("status_{user_id}"),
        from_id: user_id.to_owned(),
        content: MessageContent::Text(CONTENT_STATUS_UPDATE.to_owned()),
        status: (if online { STATUS_ONLINE } else { STATUS_OFFLINE }).to_owned(),
        ..ChatEnvelope::default()
    }
}

/// Server-generated error envelope addressed to the offending sender.
#[must_use]
pub fn system_error(offending_id: &str, to: &str, text: &str) -> ChatEnvelope {
    ChatEnvelope {
        id: format!("error_{offending_id}"),
        from_id: SYSTEM_ID.to_owned(),
        to_id: to.to_owned(),
        content: MessageContent::Text(text.to_owned()),
        ..ChatEnvelope::default()
    }
}

/// Kind of a group notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MemberAdded,
    MemberLeft,
    AdminAction,
    GroupCreated,
}

/// System notification pushed to group members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNotification {
    pub id: String,
    pub group_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Wrap a notification in its wire envelope.
#[must_use]
pub fn group_notification_frame(notification: &GroupNotification) -> serde_json::Value {
    serde_json::json!({
        "messageType": KIND_GROUP_NOTIFICATION,
        "groupId": notification.group_id,
        "data": notification,
    })
}

/// Envelope telling a banned member the group is gone for them. The target's
/// session stays open.
#[must_use]
pub fn group_disconnect_frame(group_id: &str, reason: &str) -> serde_json::Value {
    serde_json::json!({
        "messageType": KIND_GROUP_DISCONNECT,
        "groupId": group_id,
        "reason": reason,
    })
}

/// Opaque peer-to-peer session-establishment payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingEnvelope {
    pub from_id: String,
    pub to_id: String,
    /// The original frame text, forwarded untouched.
    pub raw: String,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Chat(Box<ChatEnvelope>),
    Signaling(SignalingEnvelope),
    /// Recognized server-origin kinds that clients have no business sending.
    Ignored,
}

/// Decode one frame. `messageType` selects the non-chat kinds; anything
/// else, including unrecognized values, takes the chat path.
pub fn decode(raw: &str) -> Result<Inbound, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    match value.get("messageType").and_then(serde_json::Value::as_str) {
        Some(KIND_SIGNALING) => Ok(Inbound::Signaling(SignalingEnvelope {
            from_id: field(&value, "fromId"),
            to_id: field(&value, "toId"),
            raw: raw.to_owned(),
        })),
        Some(KIND_GROUP_NOTIFICATION | KIND_GROUP_DISCONNECT) => Ok(Inbound::Ignored),
        _ => Ok(Inbound::Chat(Box::new(serde_json::from_value(value)?))),
    }
}

fn field(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// The message a receipt refers to: the conventional `delivery_`/`read_` id
/// prefix when present, otherwise the receipt's `toId`.
#[must_use]
pub fn referenced_message_id(envelope: &ChatEnvelope) -> &str {
    envelope
        .id
        .strip_prefix("delivery_")
        .or_else(|| envelope.id.strip_prefix("read_"))
        .unwrap_or(&envelope.to_id)
}
