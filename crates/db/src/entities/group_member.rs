//! Group member entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Admin - can moderate members.
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Regular member.
    #[sea_orm(string_value = "member")]
    Member,
}

impl Default for MemberRole {
    fn default() -> Self {
        Self::Member
    }
}

impl MemberRole {
    /// Check if the role carries moderation rights.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Group member - tracks which users are in which groups.
///
/// `(group_id, user_id)` is the primary key; moderation toggles the
/// `is_muted`/`is_banned` flags without removing the row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    pub role: MemberRole,

    pub joined_at: DateTimeWithTimeZone,

    /// Muted members cannot send to the group.
    #[sea_orm(default_value = false)]
    pub is_muted: bool,

    /// Banned members are invisible to fan-out, presence, and listings.
    #[sea_orm(default_value = false)]
    pub is_banned: bool,
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
