//! Group and membership repository.

use std::sync::Arc;

use peerlink_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use crate::entities::group_member::MemberRole;
use crate::entities::{Group, GroupMember, group, group_member};

/// Repository for group and membership operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Group Operations ====================

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Create a group together with its initial membership rows in a single
    /// transaction. Partial success is never observable.
    pub async fn create_with_members(
        &self,
        group: group::ActiveModel,
        members: Vec<group_member::ActiveModel>,
    ) -> AppResult<group::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = group
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for member in members {
            GroupMember::insert(member)
                .on_conflict(
                    OnConflict::columns([group_member::Column::GroupId, group_member::Column::UserId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Groups a user belongs to (non-banned memberships), with the derived
    /// member count for each.
    pub async fn groups_for_user(&self, user_id: &str) -> AppResult<Vec<(group::Model, u64)>> {
        let memberships = GroupMember::find()
            .filter(group_member::Column::UserId.eq(user_id))
            .filter(group_member::Column::IsBanned.eq(false))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let group_ids: Vec<String> = memberships.into_iter().map(|m| m.group_id).collect();
        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        let groups = Group::find()
            .filter(group::Column::Id.is_in(group_ids))
            .order_by(group::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut result = Vec::with_capacity(groups.len());
        for group in groups {
            let count = self.count_members(&group.id).await?;
            result.push((group, count));
        }

        Ok(result)
    }

    /// Group ids of a user's non-banned memberships.
    pub async fn group_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        let memberships = GroupMember::find()
            .filter(group_member::Column::UserId.eq(user_id))
            .filter(group_member::Column::IsBanned.eq(false))
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(memberships.into_iter().map(|m| m.group_id).collect())
    }

    // ==================== Member Operations ====================

    /// Get member record.
    pub async fn get_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_member::Model>> {
        GroupMember::find_by_id((group_id.to_owned(), user_id.to_owned()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a member row, ignoring duplicates. Returns whether a row was
    /// actually inserted.
    pub async fn add_member(&self, model: group_member::ActiveModel) -> AppResult<bool> {
        let inserted = GroupMember::insert(model)
            .on_conflict(
                OnConflict::columns([group_member::Column::GroupId, group_member::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Remove a member row. Returns whether a row existed.
    pub async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let deleted = GroupMember::delete_many()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(deleted.rows_affected > 0)
    }

    /// List members of a group, excluding banned rows, admins first.
    pub async fn list_members(&self, group_id: &str) -> AppResult<Vec<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::IsBanned.eq(false))
            .order_by(group_member::Column::Role, Order::Asc)
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Member ids eligible for fan-out and notifications (banned excluded).
    pub async fn member_ids(&self, group_id: &str) -> AppResult<Vec<String>> {
        let members = GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::IsBanned.eq(false))
            .select_only()
            .column(group_member::Column::UserId)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(members)
    }

    /// Count non-banned members in a group.
    pub async fn count_members(&self, group_id: &str) -> AppResult<u64> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::IsBanned.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count effective admins of a group. A banned admin cannot act, so the
    /// sole-admin guards must not count them.
    pub async fn count_admins(&self, group_id: &str) -> AppResult<u64> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::Role.eq(MemberRole::Admin))
            .filter(group_member::Column::IsBanned.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Toggle the muted flag on a member row.
    pub async fn set_muted(&self, group_id: &str, user_id: &str, muted: bool) -> AppResult<()> {
        GroupMember::update_many()
            .col_expr(group_member::Column::IsMuted, Expr::value(muted))
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Toggle the banned flag on a member row.
    pub async fn set_banned(&self, group_id: &str, user_id: &str, banned: bool) -> AppResult<()> {
        GroupMember::update_many()
            .col_expr(group_member::Column::IsBanned, Expr::value(banned))
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Set a member's role.
    pub async fn set_role(&self, group_id: &str, user_id: &str, role: MemberRole) -> AppResult<()> {
        GroupMember::update_many()
            .col_expr(group_member::Column::Role, Expr::value(role))
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
