use async_trait::async_trait;
use bastion_core::{
    Account, AccountId, Error,
    error::{AuthError, StorageError, utilities::DatabaseResultExt},
    repositories::AccountRepository,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::from_unix;

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteAccount {
    id: String,
    username: String,
    email: String,
    nickname: Option<String>,
    avatar: Option<String>,
    description: Option<String>,
    password_hash: String,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteAccount> for Account {
    fn from(row: SqliteAccount) -> Self {
        Account {
            id: AccountId::new(&row.id),
            username: row.username,
            email: row.email,
            nickname: row.nickname,
            avatar: row.avatar,
            description: row.description,
            password_hash: row.password_hash,
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        }
    }
}

/// Map a unique violation on `accounts` to the field that clashed.
fn map_create_err(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let field = if db.message().contains("accounts.email") {
                "email"
            } else {
                "username"
            };
            return AuthError::AccountAlreadyExists(field.to_string()).into();
        }
    }
    tracing::error!(error = %e, "Failed to create account");
    Error::Storage(StorageError::Database(e.to_string()))
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, username, email, nickname, avatar, description, password_hash, created_at, updated_at
    FROM accounts
"#;

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            INSERT INTO accounts (id, username, email, nickname, avatar, description, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id, username, email, nickname, avatar, description, password_hash, created_at, updated_at
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.nickname)
        .bind(&account.avatar)
        .bind(&account.description)
        .bind(&account.password_hash)
        .bind(account.created_at.timestamp())
        .bind(account.updated_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(map_create_err)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!("{SELECT_ACCOUNT} WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_db_err("Failed to find account by id")?;

        Ok(row.map(Account::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        let row =
            sqlx::query_as::<_, SqliteAccount>(&format!("{SELECT_ACCOUNT} WHERE username = ?1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_db_err("Failed to find account by username")?;

        Ok(row.map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!("{SELECT_ACCOUNT} WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_db_err("Failed to find account by email")?;

        Ok(row.map(Account::from))
    }

    async fn update(&self, account: &Account) -> Result<Account, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            UPDATE accounts
            SET nickname = ?2, avatar = ?3, description = ?4, updated_at = ?5
            WHERE id = ?1
            RETURNING id, username, email, nickname, avatar, description, password_hash, created_at, updated_at
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.nickname)
        .bind(&account.avatar)
        .bind(&account.description)
        .bind(account.updated_at.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to update account")?
        .ok_or(StorageError::NotFound)?;

        Ok(row.into())
    }

    async fn set_password_hash(
        &self,
        id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result =
            sqlx::query("UPDATE accounts SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id.as_str())
                .bind(password_hash)
                .bind(updated_at.timestamp())
                .execute(&self.pool)
                .await
                .map_db_err("Failed to update password hash")?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound.into());
        }
        Ok(())
    }
}
