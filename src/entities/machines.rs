use sea_orm::entity::prelude::*;

pub const STATUS_FREE: &str = "free";
pub const STATUS_OCCUPIED: &str = "occupied";

/// One row per known machine. The occupancy columns are only populated while
/// `status` is `occupied`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "machines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip: String,
    pub status: String,
    pub occupant: Option<String>,
    pub project: Option<String>,
    pub duration_hours: Option<f64>,
    pub started_at: Option<DateTimeUtc>,
    pub main_released: bool,
    pub added_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contributions::Entity")]
    Contributions,
}

impl Related<super::contributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
