//! Create instance_data table holding the latest probe snapshot.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_instances_table::Instances;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InstanceData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InstanceData::InstanceId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InstanceData::Title).string().not_null())
                    .col(ColumnDef::new(InstanceData::Description).text().not_null())
                    .col(ColumnDef::new(InstanceData::Thumbnail).string().null())
                    .col(
                        ColumnDef::new(InstanceData::UserCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InstanceData::StatusCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(InstanceData::ContactHandle).string().not_null())
                    .col(ColumnDef::new(InstanceData::Registrations).boolean().not_null())
                    .col(
                        ColumnDef::new(InstanceData::ApprovalRequired)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InstanceData::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_instance_data_instance")
                            .from(InstanceData::Table, InstanceData::InstanceId)
                            .to(Instances::Table, Instances::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InstanceData::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum InstanceData {
    Table,
    InstanceId,
    Title,
    Description,
    Thumbnail,
    UserCount,
    StatusCount,
    ContactHandle,
    Registrations,
    ApprovalRequired,
    UpdatedAt,
}
