//! Domain service for machine occupancy.
//!
//! Covers booking, assignment, contributor sharing, releases and the machine
//! inventory. Every mutating call takes the acting user first and checks the
//! role or ownership rule before anything is written.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{Contribution, InvalidInput, Machine, MachineState, UsageLog};

/// Errors specific to occupancy operations.
#[derive(Debug, Error)]
pub enum OccupancyError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<InvalidInput> for OccupancyError {
    fn from(err: InvalidInput) -> Self {
        Self::Validation(err.0)
    }
}

impl From<sea_orm::DbErr> for OccupancyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OccupancyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// Project and planned duration for a new usage span.
#[derive(Debug, Clone)]
pub struct UsageRequest {
    pub project: String,
    pub duration_hours: f64,
}

impl UsageRequest {
    pub fn new(project: impl Into<String>, duration_hours: f64) -> Self {
        Self {
            project: project.into(),
            duration_hours,
        }
    }
}

/// Outcome of closing a usage span.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseSummary {
    pub log: UsageLog,
    /// The machine went back to the free pool as a result.
    pub machine_freed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorView {
    pub contribution: Contribution,
    pub name: String,
}

/// A machine with display names resolved, as shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct MachineOverview {
    pub ip: String,
    pub state: MachineState,
    pub occupant_name: Option<String>,
    pub contributors: Vec<ContributorView>,
}

impl MachineOverview {
    #[must_use]
    pub fn has_contributor(&self, identity: &str) -> bool {
        self.contributors
            .iter()
            .any(|c| c.contribution.contributor == identity)
    }
}

/// Domain service trait for occupancy.
#[async_trait::async_trait]
pub trait OccupancyService: Send + Sync {
    /// Books a free machine for the acting user.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError::Conflict`] if the machine is not free.
    async fn book(
        &self,
        actor: &User,
        ip: &str,
        request: UsageRequest,
    ) -> Result<Machine, OccupancyError>;

    /// Books a free machine on behalf of `target_email`.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError::Forbidden`] unless the actor may assign.
    async fn assign_free(
        &self,
        actor: &User,
        ip: &str,
        target_email: &str,
        request: UsageRequest,
    ) -> Result<Machine, OccupancyError>;

    /// Attaches `target_email` as a contributor to an occupied machine.
    async fn assign_contributor(
        &self,
        actor: &User,
        ip: &str,
        target_email: &str,
        request: UsageRequest,
    ) -> Result<Contribution, OccupancyError>;

    /// Attaches the acting user as a contributor to an occupied machine.
    async fn self_contribute(
        &self,
        actor: &User,
        ip: &str,
        request: UsageRequest,
    ) -> Result<Contribution, OccupancyError>;

    /// Ends the acting user's primary occupancy of `ip`.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError::NotFound`] if there is no open primary span
    /// and [`OccupancyError::Forbidden`] if someone else holds the machine.
    async fn release_primary(&self, actor: &User, ip: &str)
    -> Result<ReleaseSummary, OccupancyError>;

    /// Ends the acting user's contribution on `ip`.
    async fn release_contribution(
        &self,
        actor: &User,
        ip: &str,
    ) -> Result<ReleaseSummary, OccupancyError>;

    /// Registers a new free machine and returns its canonical address.
    async fn add_machine(&self, actor: &User, ip: &str) -> Result<String, OccupancyError>;

    /// Purges a machine, its occupancy and its contributors without logging.
    /// Returns `false` if the machine was unknown.
    async fn remove_machine(&self, actor: &User, ip: &str) -> Result<bool, OccupancyError>;

    async fn machine_state(&self, ip: &str) -> Result<Machine, OccupancyError>;

    async fn contributions_for(&self, ip: &str) -> Result<Vec<Contribution>, OccupancyError>;

    /// Every machine with occupant and contributor names resolved.
    async fn list_machines(&self) -> Result<Vec<MachineOverview>, OccupancyError>;

    /// Usage spans that started in `[from, to)`, newest first.
    async fn logs_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>, OccupancyError>;
}
