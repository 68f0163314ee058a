//! Migration to create the injection_operations table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InjectionOperations::Table)
                    .if_not_exists()
                    .col(pk_auto(InjectionOperations::Id))
                    .col(string(InjectionOperations::UserId).not_null())
                    .col(string(InjectionOperations::Status).not_null())
                    .col(double(InjectionOperations::RangeFrom))
                    .col(double(InjectionOperations::RangeTo))
                    .col(double(InjectionOperations::Step))
                    .col(double(InjectionOperations::Volume))
                    .col(integer(InjectionOperations::ElementCount))
                    .col(string_null(InjectionOperations::ErrorMessage))
                    .col(timestamp_with_time_zone(InjectionOperations::StartedAt))
                    .col(timestamp_with_time_zone_null(InjectionOperations::EndedAt))
                    .col(
                        timestamp_with_time_zone(InjectionOperations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(InjectionOperations::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_injection_operations_user_created")
                    .table(InjectionOperations::Table)
                    .col(InjectionOperations::UserId)
                    .col(InjectionOperations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index for querying by status (active injections)
        manager
            .create_index(
                Index::create()
                    .name("idx_injection_operations_status")
                    .table(InjectionOperations::Table)
                    .col(InjectionOperations::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InjectionOperations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InjectionOperations {
    Table,
    Id,
    UserId,
    Status,
    RangeFrom,
    RangeTo,
    Step,
    Volume,
    ElementCount,
    ErrorMessage,
    StartedAt,
    EndedAt,
    CreatedAt,
    UpdatedAt,
}
