use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "usage_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ip: String,
    pub identity: String,
    /// Set for contribution spans only.
    pub main_occupant: Option<String>,
    pub project: String,
    pub duration_hours: f64,
    pub started_at: DateTimeUtc,
    pub ended_at: DateTimeUtc,
    pub is_contribution: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
