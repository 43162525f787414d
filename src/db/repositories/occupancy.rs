//! State transitions on a machine and its contributors.
//!
//! Each transition is a single transaction. When a usage span closes, the
//! usage log row is written before the state row is changed or deleted.
//! Races between concurrent requests are settled by conditional updates and
//! the unique index on contributions, never by in-process locks.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, Query},
};

use crate::domain::{Contribution, Machine, MachineState, UsageLog};
use crate::entities::{contributions, machines, prelude::*, usage_logs};

/// What a caller wants to start on a machine.
#[derive(Debug, Clone)]
pub struct UsageClaim<'a> {
    pub identity: &'a str,
    pub project: &'a str,
    pub duration_hours: f64,
}

#[derive(Debug)]
pub enum OccupyOutcome {
    Occupied,
    UnknownMachine,
    AlreadyOccupied,
}

#[derive(Debug)]
pub enum AttachOutcome {
    Attached(Contribution),
    UnknownMachine,
    NotOccupied,
    IsPrimaryOccupant,
    AlreadyContributing,
}

#[derive(Debug)]
pub enum PrimaryReleaseOutcome {
    /// `freed` is true when no contributors remained and the machine went
    /// back to the free pool.
    Released { log: UsageLog, freed: bool },
    NotOccupied,
    NotOccupant { occupant: String },
}

#[derive(Debug)]
pub enum ContributionReleaseOutcome {
    Released { log: UsageLog, freed: bool },
    NotContributing,
}

pub struct OccupancyRepository {
    conn: DatabaseConnection,
}

impl OccupancyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Free -> Occupied. Only succeeds if the row is still `free` at the time
    /// of the update.
    pub async fn occupy(&self, ip: &str, claim: &UsageClaim<'_>) -> Result<OccupyOutcome> {
        let result = Machines::update_many()
            .col_expr(
                machines::Column::Status,
                Expr::value(machines::STATUS_OCCUPIED),
            )
            .col_expr(machines::Column::Occupant, Expr::value(claim.identity))
            .col_expr(machines::Column::Project, Expr::value(claim.project))
            .col_expr(
                machines::Column::DurationHours,
                Expr::value(claim.duration_hours),
            )
            .col_expr(machines::Column::StartedAt, Expr::value(Utc::now()))
            .col_expr(machines::Column::MainReleased, Expr::value(false))
            .filter(machines::Column::Ip.eq(ip))
            .filter(machines::Column::Status.eq(machines::STATUS_FREE))
            .exec(&self.conn)
            .await?;

        if result.rows_affected > 0 {
            return Ok(OccupyOutcome::Occupied);
        }

        let exists = Machines::find_by_id(ip.to_string())
            .one(&self.conn)
            .await?
            .is_some();

        Ok(if exists {
            OccupyOutcome::AlreadyOccupied
        } else {
            OccupyOutcome::UnknownMachine
        })
    }

    /// Adds a contributor to an occupied machine.
    pub async fn attach(&self, ip: &str, claim: &UsageClaim<'_>) -> Result<AttachOutcome> {
        let txn = self.conn.begin().await?;
        if !lock_machine(&txn, ip).await? {
            return Ok(AttachOutcome::UnknownMachine);
        }

        let Some(row) = Machines::find_by_id(ip.to_string()).one(&txn).await? else {
            return Ok(AttachOutcome::UnknownMachine);
        };
        let machine = Machine::try_from(row)?;
        let MachineState::Occupied(occupancy) = machine.state else {
            return Ok(AttachOutcome::NotOccupied);
        };

        if occupancy.occupant == claim.identity && !occupancy.main_released {
            return Ok(AttachOutcome::IsPrimaryOccupant);
        }

        let existing = Contributions::find()
            .filter(contributions::Column::MachineIp.eq(ip))
            .filter(contributions::Column::Contributor.eq(claim.identity))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Ok(AttachOutcome::AlreadyContributing);
        }

        let inserted = contributions::ActiveModel {
            machine_ip: Set(ip.to_string()),
            main_occupant: Set(occupancy.occupant),
            contributor: Set(claim.identity.to_string()),
            project: Set(claim.project.to_string()),
            duration_hours: Set(claim.duration_hours),
            started_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        match inserted {
            Ok(model) => {
                txn.commit().await?;
                Ok(AttachOutcome::Attached(Contribution::from(model)))
            }
            Err(err) if is_unique_violation(&err) => Ok(AttachOutcome::AlreadyContributing),
            Err(err) if is_foreign_key_violation(&err) => Ok(AttachOutcome::UnknownMachine),
            Err(err) => Err(err.into()),
        }
    }

    /// Closes the primary occupant's span.
    pub async fn release_primary(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<PrimaryReleaseOutcome> {
        let txn = self.conn.begin().await?;
        if !lock_machine(&txn, ip).await? {
            return Ok(PrimaryReleaseOutcome::NotOccupied);
        }

        let Some(row) = Machines::find_by_id(ip.to_string()).one(&txn).await? else {
            return Ok(PrimaryReleaseOutcome::NotOccupied);
        };
        let machine = Machine::try_from(row)?;
        let occupancy = match machine.state {
            MachineState::Occupied(o) if !o.main_released => o,
            _ => return Ok(PrimaryReleaseOutcome::NotOccupied),
        };
        if occupancy.occupant != identity {
            return Ok(PrimaryReleaseOutcome::NotOccupant {
                occupant: occupancy.occupant,
            });
        }

        let log = insert_log(
            &txn,
            NewLog {
                ip,
                identity,
                main_occupant: None,
                project: &occupancy.project,
                duration_hours: occupancy.duration_hours,
                started_at: occupancy.started_at,
            },
        )
        .await?;

        let marked = Machines::update_many()
            .col_expr(machines::Column::MainReleased, Expr::value(true))
            .filter(machines::Column::Ip.eq(ip))
            .filter(machines::Column::Status.eq(machines::STATUS_OCCUPIED))
            .filter(machines::Column::Occupant.eq(identity))
            .filter(machines::Column::MainReleased.eq(false))
            .exec(&txn)
            .await?;
        if marked.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(PrimaryReleaseOutcome::NotOccupied);
        }

        let freed = free_if_abandoned(&txn, ip).await?;
        txn.commit().await?;

        Ok(PrimaryReleaseOutcome::Released { log, freed })
    }

    /// Closes `identity`'s contribution span on `ip`.
    pub async fn release_contribution(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<ContributionReleaseOutcome> {
        let txn = self.conn.begin().await?;
        if !lock_machine(&txn, ip).await? {
            return Ok(ContributionReleaseOutcome::NotContributing);
        }

        let Some(contribution) = Contributions::find()
            .filter(contributions::Column::MachineIp.eq(ip))
            .filter(contributions::Column::Contributor.eq(identity))
            .one(&txn)
            .await?
        else {
            return Ok(ContributionReleaseOutcome::NotContributing);
        };

        let log = insert_log(
            &txn,
            NewLog {
                ip,
                identity,
                main_occupant: Some(&contribution.main_occupant),
                project: &contribution.project,
                duration_hours: contribution.duration_hours,
                started_at: contribution.started_at,
            },
        )
        .await?;

        let deleted = Contributions::delete_by_id(contribution.id)
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(ContributionReleaseOutcome::NotContributing);
        }

        let freed = free_if_abandoned(&txn, ip).await?;
        txn.commit().await?;

        Ok(ContributionReleaseOutcome::Released { log, freed })
    }
}

/// No-op write on the machine row. Taking the write lock before any read
/// makes concurrent transitions queue on the busy timeout; a read-then-write
/// transaction would instead fail once another writer commits first.
/// Returns `false` if the machine does not exist.
async fn lock_machine<C: ConnectionTrait>(conn: &C, ip: &str) -> Result<bool, DbErr> {
    let result = Machines::update_many()
        .col_expr(
            machines::Column::MainReleased,
            Expr::col(machines::Column::MainReleased).into(),
        )
        .filter(machines::Column::Ip.eq(ip))
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

struct NewLog<'a> {
    ip: &'a str,
    identity: &'a str,
    main_occupant: Option<&'a str>,
    project: &'a str,
    duration_hours: f64,
    started_at: DateTime<Utc>,
}

async fn insert_log<C: ConnectionTrait>(conn: &C, entry: NewLog<'_>) -> Result<UsageLog, DbErr> {
    let model = usage_logs::ActiveModel {
        ip: Set(entry.ip.to_string()),
        identity: Set(entry.identity.to_string()),
        main_occupant: Set(entry.main_occupant.map(str::to_string)),
        project: Set(entry.project.to_string()),
        duration_hours: Set(entry.duration_hours),
        started_at: Set(entry.started_at),
        ended_at: Set(Utc::now()),
        is_contribution: Set(entry.main_occupant.is_some()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(UsageLog::from(model))
}

/// Returns the machine to the free pool once the primary occupant has left
/// and the last contributor is gone. Already-free rows are left untouched.
async fn free_if_abandoned<C: ConnectionTrait>(conn: &C, ip: &str) -> Result<bool, DbErr> {
    let remaining = Query::select()
        .expr(Expr::val(1))
        .from(Contributions)
        .and_where(Expr::col((Contributions, contributions::Column::MachineIp)).eq(ip))
        .to_owned();

    let result = Machines::update_many()
        .col_expr(machines::Column::Status, Expr::value(machines::STATUS_FREE))
        .col_expr(machines::Column::Occupant, Expr::value(Option::<String>::None))
        .col_expr(machines::Column::Project, Expr::value(Option::<String>::None))
        .col_expr(
            machines::Column::DurationHours,
            Expr::value(Option::<f64>::None),
        )
        .col_expr(
            machines::Column::StartedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(machines::Column::MainReleased, Expr::value(false))
        .filter(machines::Column::Ip.eq(ip))
        .filter(machines::Column::Status.eq(machines::STATUS_OCCUPIED))
        .filter(machines::Column::MainReleased.eq(true))
        .filter(Expr::exists(remaining).not())
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
