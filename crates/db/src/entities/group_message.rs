//! Group message entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A message addressed to a group rather than a single endpoint.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    pub from_id: String,

    /// Canonicalized content, same form as direct messages.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub timestamp: DateTimeWithTimeZone,

    #[sea_orm(default_value = true)]
    pub delivered: bool,

    /// JSON-encoded list of member ids that have read the message. Always
    /// contains the sender.
    #[sea_orm(column_type = "Text")]
    pub read_by: String,

    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub reply_to: Option<String>,
}

impl Model {
    /// Decode the `read_by` list.
    #[must_use]
    pub fn read_by_ids(&self) -> Vec<String> {
        serde_json::from_str(&self.read_by).unwrap_or_default()
    }

    /// Whether `user_id` has acknowledged reading this message.
    #[must_use]
    pub fn read_by_user(&self, user_id: &str) -> bool {
        self.read_by_ids().iter().any(|reader| reader == user_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
