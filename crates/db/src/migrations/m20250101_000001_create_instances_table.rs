//! Create instances table for the directory.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Instances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Instances::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Instances::Uri)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Instances::Name).string().not_null())
                    .col(ColumnDef::new(Instances::Category).string().null())
                    .col(ColumnDef::new(Instances::Platform).string_len(16).not_null())
                    .col(ColumnDef::new(Instances::NsfwFlag).string().not_null())
                    .col(
                        ColumnDef::new(Instances::Verified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Instances::FailedChecks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Instances::Banned)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Instances::BanReason).string().null())
                    .col(
                        ColumnDef::new(Instances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Instances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Retry sweeps select on (banned, ban_reason)
        manager
            .create_index(
                Index::create()
                    .name("idx_instances_banned_reason")
                    .table(Instances::Table)
                    .col(Instances::Banned)
                    .col(Instances::BanReason)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Instances::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Instances {
    Table,
    Id,
    Uri,
    Name,
    Category,
    Platform,
    NsfwFlag,
    Verified,
    FailedChecks,
    Banned,
    BanReason,
    CreatedAt,
    UpdatedAt,
}
