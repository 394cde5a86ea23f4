//! Create `group_message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GroupMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessage::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMessage::GroupId).string().not_null())
                    .col(ColumnDef::new(GroupMessage::FromId).string().not_null())
                    .col(ColumnDef::new(GroupMessage::Content).text().not_null())
                    .col(
                        ColumnDef::new(GroupMessage::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GroupMessage::Delivered)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GroupMessage::ReadBy)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(GroupMessage::Status)
                            .string()
                            .not_null()
                            .default("sent"),
                    )
                    .col(ColumnDef::new(GroupMessage::ReplyTo).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_group")
                            .from(GroupMessage::Table, GroupMessage::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: group_id for backlog fetches
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_group_id")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::GroupId)
                    .to_owned(),
            )
            .await?;

        // Index: timestamp for latest-N queries
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_timestamp")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GroupMessage {
    Table,
    Id,
    GroupId,
    FromId,
    Content,
    Timestamp,
    Delivered,
    ReadBy,
    Status,
    ReplyTo,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
}
