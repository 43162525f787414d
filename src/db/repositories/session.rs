use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};

use crate::entities::{prelude::*, sessions};

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub identity: String,
    pub token: String,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<sessions::Model> for SessionRecord {
    fn from(model: sessions::Model) -> Self {
        Self {
            identity: model.identity,
            token: model.token,
            client_ip: model.client_ip,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }
    }
}

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Replaces whatever session `record.identity` had before.
    pub async fn upsert(&self, record: &SessionRecord) -> Result<()> {
        let model = sessions::ActiveModel {
            identity: Set(record.identity.clone()),
            token: Set(record.token.clone()),
            client_ip: Set(record.client_ip.clone()),
            created_at: Set(record.created_at),
            expires_at: Set(record.expires_at),
        };

        Sessions::insert(model)
            .on_conflict(
                OnConflict::column(sessions::Column::Identity)
                    .update_columns([
                        sessions::Column::Token,
                        sessions::Column::ClientIp,
                        sessions::Column::CreatedAt,
                        sessions::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .context("Failed to store session")?;

        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        let session = Sessions::find()
            .filter(sessions::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query session")?;

        Ok(session.map(SessionRecord::from))
    }

    pub async fn find_by_identity(&self, identity: &str) -> Result<Option<SessionRecord>> {
        let session = Sessions::find_by_id(identity.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query session")?;

        Ok(session.map(SessionRecord::from))
    }

    /// Idempotent: deleting an unknown token is not an error.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool> {
        let result = Sessions::delete_many()
            .filter(sessions::Column::Token.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = Sessions::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await
            .context("Failed to prune sessions")?;

        Ok(result.rows_affected)
    }
}

/// Generate an opaque session token: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_session_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
