use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::{MySql, Pool, Row};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};

use crate::credential_store::{CredentialStore, StoreError};
use crate::data_structs::app_config::MySqlConfig;
use crate::data_structs::user::{ConnectionStatus, UserRecord};

const USER_COLUMNS: &str = "id, email, username, name, password_hash, auth, auth_last_at, credits";

#[derive(Debug)]
#[derive(Clone)]
pub struct DatabasePool {
    pool: Pool<MySql>,
}

impl DatabasePool {

    pub async fn new(config: &MySqlConfig) -> Result<Self, StoreError> {
        let connection_url = format!(
            "mysql://{}:{}@{}:{}/{}",
            config.username, config.password, config.host, config.port, config.database
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&connection_url).await?;

        Ok(DatabasePool { pool })
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        self.create_tables().await
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS users (
                id VARCHAR(64) NOT NULL PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                username VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NULL,
                auth VARCHAR(16) NOT NULL DEFAULT 'DISCONNECTED',
                auth_last_at DATETIME(3) NULL,
                credits BIGINT NOT NULL DEFAULT 0
            )
        "#)
            .execute(&self.pool).await?;
        Ok(())
    }

    fn decode_user(row: &MySqlRow) -> Result<UserRecord, StoreError> {
        let auth: String = row.try_get("auth")?;
        let auth = auth.parse::<ConnectionStatus>().map_err(StoreError::InvalidRow)?;
        let auth_last_at: Option<chrono::NaiveDateTime> = row.try_get("auth_last_at")?;

        Ok(UserRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password_hash")?,
            auth,
            auth_last_at: auth_last_at.map(|naive| naive.and_utc()),
            credits: row.try_get("credits")?,
        })
    }

    async fn fetch_by_identifier(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email=? OR username=? LIMIT 1"))
            .bind(identifier)
            .bind(identifier)
            .fetch_optional(&self.pool).await?;

        return match row {
            Some(row) => Ok(Some(Self::decode_user(&row)?)),
            None => Ok(None),
        };
    }

    async fn fetch_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id=?"))
            .bind(user_id)
            .fetch_optional(&self.pool).await?;

        return match row {
            Some(row) => Ok(Some(Self::decode_user(&row)?)),
            None => Ok(None),
        };
    }

    async fn update_status(&self, user_id: &str, status: ConnectionStatus, at: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        let result = match at {
            Some(at) => sqlx::query("UPDATE users SET auth=?, auth_last_at=? WHERE id=?")
                .bind(status.as_str())
                .bind(at.naive_utc())
                .bind(user_id)
                .execute(&self.pool).await?,
            None => sqlx::query("UPDATE users SET auth=? WHERE id=?")
                .bind(status.as_str())
                .bind(user_id)
                .execute(&self.pool).await?,
        };

        // MySQL reports changed rows, so an identical status write can match
        // a row and still report zero; only a missing id is an error.
        if result.rows_affected() == 0 && self.fetch_by_id(user_id).await?.is_none() {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }
}

impl CredentialStore for DatabasePool {
    fn find_by_identifier<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<Option<UserRecord>, StoreError>> {
        Box::pin(self.fetch_by_identifier(identifier))
    }

    fn find_by_id<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<UserRecord>, StoreError>> {
        Box::pin(self.fetch_by_id(user_id))
    }

    fn mark_connected<'a>(&'a self, user_id: &'a str, at: DateTime<Utc>) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.update_status(user_id, ConnectionStatus::Connected, Some(at)))
    }

    fn mark_disconnected<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.update_status(user_id, ConnectionStatus::Disconnected, None))
    }
}
