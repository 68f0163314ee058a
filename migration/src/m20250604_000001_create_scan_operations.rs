//! Migration to create the scan_operations table
//!
//! One row per depth/sensor scan. Readings are collected when the scan is
//! stopped and stored as a JSON array.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScanOperations::Table)
                    .if_not_exists()
                    .col(pk_auto(ScanOperations::Id))
                    .col(string(ScanOperations::UserId).not_null())
                    .col(string(ScanOperations::Status).not_null())
                    .col(json_binary(ScanOperations::SensorReadings))
                    .col(string_null(ScanOperations::ErrorMessage))
                    .col(timestamp_with_time_zone(ScanOperations::StartedAt))
                    .col(timestamp_with_time_zone_null(ScanOperations::EndedAt))
                    .col(
                        timestamp_with_time_zone(ScanOperations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ScanOperations::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // History queries filter by owner and sort by creation time
        manager
            .create_index(
                Index::create()
                    .name("idx_scan_operations_user_created")
                    .table(ScanOperations::Table)
                    .col(ScanOperations::UserId)
                    .col(ScanOperations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScanOperations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScanOperations {
    Table,
    Id,
    UserId,
    Status,
    SensorReadings,
    ErrorMessage,
    StartedAt,
    EndedAt,
    CreatedAt,
    UpdatedAt,
}
