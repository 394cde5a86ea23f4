//! Direct message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    /// Sender-chosen identifier, also used to correlate receipts.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub from_id: String,

    #[sea_orm(indexed)]
    pub to_id: String,

    /// Canonicalized content: plain text, or the JSON serialization of
    /// structured content.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub timestamp: DateTimeWithTimeZone,

    /// Has the envelope reached the recipient's session?
    #[sea_orm(default_value = false)]
    pub delivered: bool,

    /// Has the recipient acknowledged reading it?
    #[sea_orm(default_value = false)]
    pub read_status: bool,

    /// Lifecycle stage: `sent`, `delivered`, or `read`.
    pub status: String,

    /// JSON-serialized quote metadata, if this message is a reply.
    #[sea_orm(column_type = "Text", nullable)]
    pub reply_to: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
