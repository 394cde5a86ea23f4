//! Direct message repository.

use std::sync::Arc;

use peerlink_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use crate::entities::message::{self, ActiveModel, Column, Entity as Message};

/// Repository for direct message operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a message. Duplicate ids are a no-op; the existing row wins.
    pub async fn insert(&self, model: ActiveModel) -> AppResult<()> {
        Message::insert(model)
            .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the delivery lifecycle flags on a single row.
    pub async fn set_flags(&self, id: &str, delivered: bool, read: bool) -> AppResult<()> {
        Message::update_many()
            .col_expr(Column::Delivered, Expr::value(delivered))
            .col_expr(Column::ReadStatus, Expr::value(read))
            .filter(Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// All messages involving a user, ascending by timestamp.
    pub async fn find_by_participant(&self, user_id: &str) -> AppResult<Vec<message::Model>> {
        Message::find()
            .filter(
                Condition::any()
                    .add(Column::FromId.eq(user_id))
                    .add(Column::ToId.eq(user_id)),
            )
            .order_by_asc(Column::Timestamp)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Flip a batch of rows to delivered in one statement.
    pub async fn mark_delivered(&self, ids: &[String]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        Message::update_many()
            .col_expr(Column::Delivered, Expr::value(true))
            .filter(Column::Id.is_in(ids.iter().map(String::as_str)))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Delete both directions of a conversation in one transaction.
    pub async fn purge_conversation(&self, user_id: &str, contact_id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Message::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(Column::FromId.eq(user_id))
                            .add(Column::ToId.eq(contact_id)),
                    )
                    .add(
                        Condition::all()
                            .add(Column::FromId.eq(contact_id))
                            .add(Column::ToId.eq(user_id)),
                    ),
            )
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
