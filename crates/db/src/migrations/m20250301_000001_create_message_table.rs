//! Create `message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Message::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Message::FromId).string().not_null())
                    .col(ColumnDef::new(Message::ToId).string().not_null())
                    .col(ColumnDef::new(Message::Content).text().not_null())
                    .col(
                        ColumnDef::new(Message::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Message::Delivered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Message::ReadStatus)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Message::Status)
                            .string()
                            .not_null()
                            .default("sent"),
                    )
                    .col(ColumnDef::new(Message::ReplyTo).text())
                    .to_owned(),
            )
            .await?;

        // Index: from_id (sender)
        manager
            .create_index(
                Index::create()
                    .name("idx_message_from_id")
                    .table(Message::Table)
                    .col(Message::FromId)
                    .to_owned(),
            )
            .await?;

        // Index: to_id (recipient)
        manager
            .create_index(
                Index::create()
                    .name("idx_message_to_id")
                    .table(Message::Table)
                    .col(Message::ToId)
                    .to_owned(),
            )
            .await?;

        // Index: timestamp for ordered history scans
        manager
            .create_index(
                Index::create()
                    .name("idx_message_timestamp")
                    .table(Message::Table)
                    .col(Message::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Message {
    Table,
    Id,
    FromId,
    ToId,
    Content,
    Timestamp,
    Delivered,
    ReadStatus,
    Status,
    ReplyTo,
}
