use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::domain::UsageLog;
use crate::entities::{prelude::*, usage_logs};

impl From<usage_logs::Model> for UsageLog {
    fn from(model: usage_logs::Model) -> Self {
        Self {
            id: model.id,
            ip: model.ip,
            identity: model.identity,
            project: model.project,
            duration_hours: model.duration_hours,
            started_at: model.started_at,
            ended_at: model.ended_at,
            is_contribution: model.is_contribution,
            main_occupant: model.main_occupant,
        }
    }
}

/// Read side of the audit trail. Rows are only ever inserted by the
/// occupancy transitions.
pub struct UsageLogRepository {
    conn: DatabaseConnection,
}

impl UsageLogRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Spans that started in `[from, to)`, most recent first.
    pub async fn started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>> {
        let rows = UsageLogs::find()
            .filter(usage_logs::Column::StartedAt.gte(from))
            .filter(usage_logs::Column::StartedAt.lt(to))
            .order_by_desc(usage_logs::Column::StartedAt)
            .all(&self.conn)
            .await
            .context("Failed to query usage logs")?;

        Ok(rows.into_iter().map(UsageLog::from).collect())
    }

    pub async fn for_ip(&self, ip: &str) -> Result<Vec<UsageLog>> {
        let rows = UsageLogs::find()
            .filter(usage_logs::Column::Ip.eq(ip))
            .order_by_asc(usage_logs::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query usage logs for machine")?;

        Ok(rows.into_iter().map(UsageLog::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        UsageLogs::find()
            .count(&self.conn)
            .await
            .context("Failed to count usage logs")
    }
}
