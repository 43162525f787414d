use anyhow::{Context, Result, bail};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::info;

use crate::domain::{Contribution, Machine, MachineState, Occupancy};
use crate::entities::{contributions, machines, prelude::*};

impl TryFrom<machines::Model> for Machine {
    type Error = anyhow::Error;

    fn try_from(model: machines::Model) -> Result<Self> {
        let state = match model.status.as_str() {
            machines::STATUS_FREE => MachineState::Free,
            machines::STATUS_OCCUPIED => {
                let (Some(occupant), Some(project), Some(duration_hours), Some(started_at)) = (
                    model.occupant,
                    model.project,
                    model.duration_hours,
                    model.started_at,
                ) else {
                    bail!("Machine {} is occupied but has no occupancy data", model.ip);
                };
                MachineState::Occupied(Occupancy {
                    occupant,
                    project,
                    duration_hours,
                    started_at,
                    main_released: model.main_released,
                })
            }
            other => bail!("Machine {} has unknown status '{other}'", model.ip),
        };

        Ok(Self {
            ip: model.ip,
            state,
        })
    }
}

impl From<contributions::Model> for Contribution {
    fn from(model: contributions::Model) -> Self {
        Self {
            id: model.id,
            machine_ip: model.machine_ip,
            main_occupant: model.main_occupant,
            contributor: model.contributor,
            project: model.project,
            duration_hours: model.duration_hours,
            started_at: model.started_at,
        }
    }
}

/// Machine inventory: adding, listing and purging machines.
pub struct MachineRepository {
    conn: DatabaseConnection,
}

impl MachineRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Registers a free machine. Returns `false` if the ip is already known.
    pub async fn add(&self, ip: &str) -> Result<bool> {
        let model = machines::ActiveModel {
            ip: Set(ip.to_string()),
            status: Set(machines::STATUS_FREE.to_string()),
            occupant: Set(None),
            project: Set(None),
            duration_hours: Set(None),
            started_at: Set(None),
            main_released: Set(false),
            added_at: Set(Utc::now()),
        };

        let inserted = Machines::insert(model)
            .on_conflict(
                OnConflict::column(machines::Column::Ip)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert machine")?;

        if inserted > 0 {
            info!(ip, "Machine added");
        }
        Ok(inserted > 0)
    }

    pub async fn get(&self, ip: &str) -> Result<Option<Machine>> {
        Machines::find_by_id(ip.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query machine")?
            .map(Machine::try_from)
            .transpose()
    }

    pub async fn list(&self) -> Result<Vec<Machine>> {
        Machines::find()
            .order_by_asc(machines::Column::Ip)
            .all(&self.conn)
            .await
            .context("Failed to list machines")?
            .into_iter()
            .map(Machine::try_from)
            .collect()
    }

    pub async fn contributions_for(&self, ip: &str) -> Result<Vec<Contribution>> {
        let rows = Contributions::find()
            .filter(contributions::Column::MachineIp.eq(ip))
            .order_by_asc(contributions::Column::StartedAt)
            .all(&self.conn)
            .await
            .context("Failed to query contributions")?;

        Ok(rows.into_iter().map(Contribution::from).collect())
    }

    pub async fn all_contributions(&self) -> Result<Vec<Contribution>> {
        let rows = Contributions::find()
            .order_by_asc(contributions::Column::MachineIp)
            .order_by_asc(contributions::Column::StartedAt)
            .all(&self.conn)
            .await
            .context("Failed to list contributions")?;

        Ok(rows.into_iter().map(Contribution::from).collect())
    }

    /// Deletes the machine and everything attached to it without writing
    /// usage logs. Returns `false` if the ip was unknown.
    pub async fn remove(&self, ip: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let detached = Contributions::delete_many()
            .filter(contributions::Column::MachineIp.eq(ip))
            .exec(&txn)
            .await?;

        let result = Machines::delete_by_id(ip.to_string()).exec(&txn).await?;

        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!(
                ip,
                contributions = detached.rows_affected,
                "Machine removed"
            );
        }
        Ok(removed)
    }
}
