use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{Contribution, Machine, Role, UsageLog};

pub mod migrator;
pub mod repositories;

pub use repositories::occupancy::{
    AttachOutcome, ContributionReleaseOutcome, OccupyOutcome, PrimaryReleaseOutcome, UsageClaim,
};
pub use repositories::session::{SessionRecord, generate_session_token};
pub use repositories::user::{User, hash_password, hash_password_blocking};

/// Handle to the persistent store. Cheap to clone; every clone shares the
/// same connection pool.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
        let in_memory = path_str.starts_with(":memory:") || path_str.contains("mode=memory");
        if !in_memory {
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn machine_repo(&self) -> repositories::machine::MachineRepository {
        repositories::machine::MachineRepository::new(self.conn.clone())
    }

    fn occupancy_repo(&self) -> repositories::occupancy::OccupancyRepository {
        repositories::occupancy::OccupancyRepository::new(self.conn.clone())
    }

    fn usage_log_repo(&self) -> repositories::usage_log::UsageLogRepository {
        repositories::usage_log::UsageLogRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
        role: Role,
    ) -> Result<User, sea_orm::DbErr> {
        self.user_repo()
            .create(name, email, password_hash, role)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn list_users_by_roles(&self, roles: &[Role]) -> Result<Vec<User>> {
        self.user_repo().list_by_roles(roles).await
    }

    pub async fn set_user_role(&self, email: &str, role: Role) -> Result<bool> {
        self.user_repo().set_role(email, role).await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(email, password).await
    }

    // Machines

    pub async fn add_machine(&self, ip: &str) -> Result<bool> {
        self.machine_repo().add(ip).await
    }

    pub async fn get_machine(&self, ip: &str) -> Result<Option<Machine>> {
        self.machine_repo().get(ip).await
    }

    pub async fn list_machines(&self) -> Result<Vec<Machine>> {
        self.machine_repo().list().await
    }

    pub async fn remove_machine(&self, ip: &str) -> Result<bool> {
        self.machine_repo().remove(ip).await
    }

    pub async fn contributions_for(&self, ip: &str) -> Result<Vec<Contribution>> {
        self.machine_repo().contributions_for(ip).await
    }

    pub async fn all_contributions(&self) -> Result<Vec<Contribution>> {
        self.machine_repo().all_contributions().await
    }

    // Occupancy transitions

    pub async fn occupy_machine(&self, ip: &str, claim: &UsageClaim<'_>) -> Result<OccupyOutcome> {
        self.occupancy_repo().occupy(ip, claim).await
    }

    pub async fn attach_contributor(
        &self,
        ip: &str,
        claim: &UsageClaim<'_>,
    ) -> Result<AttachOutcome> {
        self.occupancy_repo().attach(ip, claim).await
    }

    pub async fn release_primary(&self, ip: &str, identity: &str) -> Result<PrimaryReleaseOutcome> {
        self.occupancy_repo().release_primary(ip, identity).await
    }

    pub async fn release_contribution(
        &self,
        ip: &str,
        identity: &str,
    ) -> Result<ContributionReleaseOutcome> {
        self.occupancy_repo()
            .release_contribution(ip, identity)
            .await
    }

    // Usage logs

    pub async fn usage_logs_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>> {
        self.usage_log_repo().started_between(from, to).await
    }

    pub async fn usage_logs_for_ip(&self, ip: &str) -> Result<Vec<UsageLog>> {
        self.usage_log_repo().for_ip(ip).await
    }

    pub async fn usage_log_count(&self) -> Result<u64> {
        self.usage_log_repo().count().await
    }

    // Sessions

    pub async fn upsert_session(&self, record: &SessionRecord) -> Result<()> {
        self.session_repo().upsert(record).await
    }

    pub async fn find_session_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        self.session_repo().find_by_token(token).await
    }

    pub async fn find_session_by_identity(&self, identity: &str) -> Result<Option<SessionRecord>> {
        self.session_repo().find_by_identity(identity).await
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        self.session_repo().delete_by_token(token).await
    }

    pub async fn prune_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        self.session_repo().prune_expired(now).await
    }
}
