//! `SeaORM` Entity prelude

pub use super::injection_operations::Entity as InjectionOperations;
pub use super::movement_commands::Entity as MovementCommands;
pub use super::scan_operations::Entity as ScanOperations;
