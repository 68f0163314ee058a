//! SeaORM Entity for injection_operations table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "injection_operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub status: String,
    /// Infrared range start (mm)
    pub range_from: f64,
    /// Infrared range end (mm)
    pub range_to: f64,
    /// Step between injections (mm)
    pub step: f64,
    /// Liquid volume per element (ml)
    pub volume: f64,
    pub element_count: i32,
    pub error_message: Option<String>,
    pub started_at: DateTimeWithTimeZone,
    pub ended_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
