//! Migration to create the movement_commands table (axis moves and homing)

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MovementCommands::Table)
                    .if_not_exists()
                    .col(pk_auto(MovementCommands::Id))
                    .col(string(MovementCommands::UserId).not_null())
                    .col(string(MovementCommands::Status).not_null())
                    .col(string(MovementCommands::Action))
                    .col(string(MovementCommands::Axis))
                    .col(small_integer(MovementCommands::Direction))
                    .col(integer(MovementCommands::Speed))
                    .col(integer(MovementCommands::Steps))
                    .col(string_null(MovementCommands::ErrorMessage))
                    .col(timestamp_with_time_zone(MovementCommands::StartedAt))
                    .col(timestamp_with_time_zone_null(MovementCommands::EndedAt))
                    .col(
                        timestamp_with_time_zone(MovementCommands::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(MovementCommands::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movement_commands_user_created")
                    .table(MovementCommands::Table)
                    .col(MovementCommands::UserId)
                    .col(MovementCommands::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MovementCommands::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MovementCommands {
    Table,
    Id,
    UserId,
    Status,
    Action,
    Axis,
    Direction,
    Speed,
    Steps,
    ErrorMessage,
    StartedAt,
    EndedAt,
    CreatedAt,
    UpdatedAt,
}
