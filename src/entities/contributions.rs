use sea_orm::entity::prelude::*;

/// Unique on (`machine_ip`, `main_occupant`, `contributor`); the index is
/// created by the migrator.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub machine_ip: String,
    pub main_occupant: String,
    pub contributor: String,
    pub project: String,
    pub duration_hours: f64,
    pub started_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::machines::Entity",
        from = "Column::MachineIp",
        to = "super::machines::Column::Ip",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Machines,
}

impl Related<super::machines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
