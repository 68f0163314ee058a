pub use sea_orm_migration::prelude::*;

mod m20250604_000001_create_scan_operations;
mod m20250604_000002_create_injection_operations;
mod m20250604_000003_create_movement_commands;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250604_000001_create_scan_operations::Migration),
            Box::new(m20250604_000002_create_injection_operations::Migration),
            Box::new(m20250604_000003_create_movement_commands::Migration),
        ]
    }
}
