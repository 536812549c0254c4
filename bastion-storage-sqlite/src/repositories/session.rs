use async_trait::async_trait;
use bastion_core::{
    AccountId, Error, Session, SessionToken, crypto::verify_token_hash,
    error::utilities::DatabaseResultExt,
    repositories::SessionRepository,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::from_unix;

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteSession {
    token_hash: String,
    account_id: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: i64,
    updated_at: i64,
    expires_at: i64,
}

impl SqliteSession {
    fn into_session(self, token: &SessionToken) -> Session {
        Session {
            token: token.clone(),
            account_id: AccountId::new(&self.account_id),
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
            expires_at: from_unix(self.expires_at),
        }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, account_id, user_agent, ip_address, created_at, updated_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(session.token.hash())
        .bind(session.account_id.as_str())
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.created_at.timestamp())
        .bind(session.updated_at.timestamp())
        .bind(session.expires_at.timestamp())
        .execute(&self.pool)
        .await
        .map_db_err("Failed to create session")?;

        Ok(session)
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(
            r#"
            SELECT token_hash, account_id, user_agent, ip_address, created_at, updated_at, expires_at
            FROM sessions
            WHERE token_hash = ?1
            "#,
        )
        .bind(token.hash())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find session")?;

        Ok(row
            .filter(|row| verify_token_hash(token.as_str(), &row.token_hash))
            .map(|row| row.into_session(token)))
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
            .bind(token.hash())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to delete session")?;

        Ok(())
    }

    async fn delete_by_account_id(&self, account_id: &AccountId) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = ?1")
            .bind(account_id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to delete account sessions")?;

        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to clean up expired sessions")?;

        Ok(result.rows_affected())
    }
}
