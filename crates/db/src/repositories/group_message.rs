//! Group message repository.

use std::sync::Arc;

use peerlink_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::group_message::{self, ActiveModel, Column, Entity as GroupMessage};

/// Repository for group message operations.
#[derive(Clone)]
pub struct GroupMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupMessageRepository {
    /// Create a new group message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a group message. Duplicate ids are a no-op; the existing row
    /// wins.
    pub async fn insert(&self, model: ActiveModel) -> AppResult<()> {
        GroupMessage::insert(model)
            .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// The latest `limit` messages for a group, newest first.
    pub async fn latest_for_group(
        &self,
        group_id: &str,
        limit: u64,
    ) -> AppResult<Vec<group_message::Model>> {
        GroupMessage::find()
            .filter(Column::GroupId.eq(group_id))
            .order_by_desc(Column::Timestamp)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
