//! `SeaORM` implementation of the `OccupancyService` trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::{
    AttachOutcome, ContributionReleaseOutcome, OccupyOutcome, PrimaryReleaseOutcome, Store,
    UsageClaim, User,
};
use crate::domain::validation::{check_hours, normalize_email, parse_ipv4, require_text};
use crate::domain::{Contribution, Machine, Role, UsageLog};
use crate::services::occupancy_service::{
    ContributorView, MachineOverview, OccupancyError, OccupancyService, ReleaseSummary,
    UsageRequest,
};

pub struct SeaOrmOccupancyService {
    store: Store,
}

impl SeaOrmOccupancyService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn occupy(
        &self,
        ip: &str,
        identity: &str,
        request: &ValidRequest,
    ) -> Result<Machine, OccupancyError> {
        let claim = UsageClaim {
            identity,
            project: &request.project,
            duration_hours: request.duration_hours,
        };

        match self.store.occupy_machine(ip, &claim).await? {
            OccupyOutcome::Occupied => {}
            OccupyOutcome::UnknownMachine => return Err(unknown_machine(ip)),
            OccupyOutcome::AlreadyOccupied => {
                return Err(OccupancyError::Conflict(format!("{ip} is not free")));
            }
        }

        self.machine_state(ip).await
    }

    async fn attach(
        &self,
        ip: &str,
        identity: &str,
        request: &ValidRequest,
    ) -> Result<Contribution, OccupancyError> {
        let claim = UsageClaim {
            identity,
            project: &request.project,
            duration_hours: request.duration_hours,
        };

        match self.store.attach_contributor(ip, &claim).await? {
            AttachOutcome::Attached(contribution) => Ok(contribution),
            AttachOutcome::UnknownMachine => Err(unknown_machine(ip)),
            AttachOutcome::NotOccupied => {
                Err(OccupancyError::NotFound(format!("{ip} is not occupied")))
            }
            AttachOutcome::IsPrimaryOccupant => Err(OccupancyError::Validation(format!(
                "{identity} is the occupant of {ip}"
            ))),
            AttachOutcome::AlreadyContributing => Err(OccupancyError::Conflict(format!(
                "{identity} is already contributing on {ip}"
            ))),
        }
    }

    /// Looks up the user a privileged actor is acting for.
    async fn assignable_target(&self, raw_email: &str) -> Result<User, OccupancyError> {
        let email = normalize_email(raw_email)?;
        let target = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| OccupancyError::NotFound(format!("User {email} not found")))?;

        if target.role != Role::User {
            return Err(OccupancyError::Validation(format!(
                "{email} is not a normal user"
            )));
        }
        Ok(target)
    }
}

struct ValidRequest {
    project: String,
    duration_hours: f64,
}

impl TryFrom<UsageRequest> for ValidRequest {
    type Error = OccupancyError;

    fn try_from(request: UsageRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            project: require_text("project", &request.project)?,
            duration_hours: check_hours(request.duration_hours)?,
        })
    }
}

fn unknown_machine(ip: &str) -> OccupancyError {
    OccupancyError::NotFound(format!("Machine {ip} not found"))
}

fn forbidden(actor: &User, action: &str) -> OccupancyError {
    OccupancyError::Forbidden(format!("{} may not {action}", actor.role))
}

fn record_transition(kind: &'static str) {
    metrics::counter!("labtrack_transitions_total", "kind" => kind).increment(1);
}

#[async_trait]
impl OccupancyService for SeaOrmOccupancyService {
    async fn book(
        &self,
        actor: &User,
        ip: &str,
        request: UsageRequest,
    ) -> Result<Machine, OccupancyError> {
        let ip = parse_ipv4(ip)?;
        let request = ValidRequest::try_from(request)?;

        let machine = self.occupy(&ip, &actor.email, &request).await?;

        record_transition("book");
        info!(ip = %ip, identity = %actor.email, project = %request.project, "Machine booked");
        Ok(machine)
    }

    async fn assign_free(
        &self,
        actor: &User,
        ip: &str,
        target_email: &str,
        request: UsageRequest,
    ) -> Result<Machine, OccupancyError> {
        if !actor.role.can_assign() {
            return Err(forbidden(actor, "assign machines"));
        }
        let ip = parse_ipv4(ip)?;
        let request = ValidRequest::try_from(request)?;
        let target = self.assignable_target(target_email).await?;

        let machine = self.occupy(&ip, &target.email, &request).await?;

        record_transition("assign_free");
        info!(
            ip = %ip,
            identity = %target.email,
            assigned_by = %actor.email,
            "Machine assigned"
        );
        Ok(machine)
    }

    async fn assign_contributor(
        &self,
        actor: &User,
        ip: &str,
        target_email: &str,
        request: UsageRequest,
    ) -> Result<Contribution, OccupancyError> {
        if !actor.role.can_assign() {
            return Err(forbidden(actor, "assign contributors"));
        }
        let ip = parse_ipv4(ip)?;
        let request = ValidRequest::try_from(request)?;
        let target = self.assignable_target(target_email).await?;

        let contribution = self.attach(&ip, &target.email, &request).await?;

        record_transition("assign_contribute");
        info!(
            ip = %ip,
            identity = %target.email,
            assigned_by = %actor.email,
            "Contributor assigned"
        );
        Ok(contribution)
    }

    async fn self_contribute(
        &self,
        actor: &User,
        ip: &str,
        request: UsageRequest,
    ) -> Result<Contribution, OccupancyError> {
        if !actor.role.can_self_contribute() {
            return Err(forbidden(actor, "contribute on their own behalf"));
        }
        let ip = parse_ipv4(ip)?;
        let request = ValidRequest::try_from(request)?;

        let contribution = self.attach(&ip, &actor.email, &request).await?;

        record_transition("self_contribute");
        info!(ip = %ip, identity = %actor.email, "Contributor joined");
        Ok(contribution)
    }

    async fn release_primary(
        &self,
        actor: &User,
        ip: &str,
    ) -> Result<ReleaseSummary, OccupancyError> {
        let ip = parse_ipv4(ip)?;

        match self.store.release_primary(&ip, &actor.email).await? {
            PrimaryReleaseOutcome::Released { log, freed } => {
                record_transition("release_main");
                info!(ip = %ip, identity = %actor.email, freed, "Primary occupancy released");
                Ok(ReleaseSummary {
                    log,
                    machine_freed: freed,
                })
            }
            PrimaryReleaseOutcome::NotOccupied => Err(OccupancyError::NotFound(format!(
                "No active booking of {ip}"
            ))),
            PrimaryReleaseOutcome::NotOccupant { occupant } => {
                Err(OccupancyError::Forbidden(format!(
                    "{ip} is held by {occupant}"
                )))
            }
        }
    }

    async fn release_contribution(
        &self,
        actor: &User,
        ip: &str,
    ) -> Result<ReleaseSummary, OccupancyError> {
        let ip = parse_ipv4(ip)?;

        match self.store.release_contribution(&ip, &actor.email).await? {
            ContributionReleaseOutcome::Released { log, freed } => {
                record_transition("release_contrib");
                info!(ip = %ip, identity = %actor.email, freed, "Contribution released");
                Ok(ReleaseSummary {
                    log,
                    machine_freed: freed,
                })
            }
            ContributionReleaseOutcome::NotContributing => Err(OccupancyError::NotFound(
                format!("No contribution of yours on {ip}"),
            )),
        }
    }

    async fn add_machine(&self, actor: &User, ip: &str) -> Result<String, OccupancyError> {
        if !actor.role.can_manage_machines() {
            return Err(forbidden(actor, "add machines"));
        }
        let ip = parse_ipv4(ip)?;

        if !self.store.add_machine(&ip).await? {
            return Err(OccupancyError::Conflict(format!("{ip} already exists")));
        }

        record_transition("add_machine");
        info!(ip = %ip, identity = %actor.email, "Machine registered");
        Ok(ip)
    }

    async fn remove_machine(&self, actor: &User, ip: &str) -> Result<bool, OccupancyError> {
        if !actor.role.can_manage_machines() {
            return Err(forbidden(actor, "remove machines"));
        }
        let ip = parse_ipv4(ip)?;

        let removed = self.store.remove_machine(&ip).await?;
        if removed {
            record_transition("remove_machine");
            info!(ip = %ip, identity = %actor.email, "Machine purged");
        }
        Ok(removed)
    }

    async fn machine_state(&self, ip: &str) -> Result<Machine, OccupancyError> {
        let ip = parse_ipv4(ip)?;
        self.store
            .get_machine(&ip)
            .await?
            .ok_or_else(|| unknown_machine(&ip))
    }

    async fn contributions_for(&self, ip: &str) -> Result<Vec<Contribution>, OccupancyError> {
        let ip = parse_ipv4(ip)?;
        Ok(self.store.contributions_for(&ip).await?)
    }

    async fn list_machines(&self) -> Result<Vec<MachineOverview>, OccupancyError> {
        let names: HashMap<String, String> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.email, u.name))
            .collect();
        let display = |identity: &str| {
            names
                .get(identity)
                .cloned()
                .unwrap_or_else(|| identity.to_string())
        };

        let mut by_machine: HashMap<String, Vec<Contribution>> = HashMap::new();
        for contribution in self.store.all_contributions().await? {
            by_machine
                .entry(contribution.machine_ip.clone())
                .or_default()
                .push(contribution);
        }

        let machines = self.store.list_machines().await?;
        Ok(machines
            .into_iter()
            .map(|machine| {
                let contributors = by_machine
                    .remove(&machine.ip)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|contribution| ContributorView {
                        name: display(&contribution.contributor),
                        contribution,
                    })
                    .collect();
                MachineOverview {
                    occupant_name: machine.state.occupancy().map(|o| display(&o.occupant)),
                    ip: machine.ip,
                    state: machine.state,
                    contributors,
                }
            })
            .collect())
    }

    async fn logs_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>, OccupancyError> {
        if to <= from {
            return Err(OccupancyError::Validation(
                "End of range must be after its start".to_string(),
            ));
        }
        Ok(self.store.usage_logs_between(from, to).await?)
    }
}
