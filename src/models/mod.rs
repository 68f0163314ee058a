pub mod device;
pub mod error;
pub mod inference;
pub mod injection;
pub mod movement;
pub mod operation;
pub mod scan;
