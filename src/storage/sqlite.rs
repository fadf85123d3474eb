// ABOUTME: SQLite connection store on sqlx with single-statement atomic upserts
// ABOUTME: Holds only encrypted envelopes; schema is created on first open
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::ConnectionStore;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{PersonalConnection, SharedConnection};

/// SQLite-backed store. Every put is a single `INSERT .. ON CONFLICT DO
/// UPDATE`, so a row is always replaced whole and readers never observe a
/// half-written record.
pub struct SqliteConnectionStore {
    pool: SqlitePool,
}

impl SqliteConnectionStore {
    /// Open (and if necessary create) the database at `database_url`, e.g.
    /// `sqlite:connections.db?mode=rwc` or `sqlite::memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`] if the pool cannot be opened or
    /// the schema cannot be created.
    pub async fn new(database_url: &str) -> ConnectorResult<Self> {
        // A pooled second connection to :memory: would open a different
        // database entirely.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS personal_connections (
                user_id TEXT NOT NULL,
                connector_key TEXT NOT NULL,
                encrypted_token TEXT NOT NULL,
                expires_at TEXT,
                scope TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, connector_key)
            )",
        )
        .execute(&pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS shared_connections (
                project_id TEXT NOT NULL,
                connector_key TEXT NOT NULL,
                encrypted_credential TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (project_id, connector_key)
            )",
        )
        .execute(&pool)
        .await
        .map_err(storage_err)?;

        Ok(Self { pool })
    }

    fn personal_from_row(row: &SqliteRow) -> ConnectorResult<PersonalConnection> {
        Ok(PersonalConnection {
            user_id: parse_uuid(row.get("user_id"))?,
            connector_key: row.get("connector_key"),
            encrypted_token: row.get("encrypted_token"),
            expires_at: parse_optional_datetime(row.get("expires_at"))?,
            scope: row.get("scope"),
            created_at: parse_datetime(row.get("created_at"))?,
            updated_at: parse_datetime(row.get("updated_at"))?,
        })
    }

    fn shared_from_row(row: &SqliteRow) -> ConnectorResult<SharedConnection> {
        Ok(SharedConnection {
            project_id: parse_uuid(row.get("project_id"))?,
            connector_key: row.get("connector_key"),
            encrypted_credential: row.get("encrypted_credential"),
            created_at: parse_datetime(row.get("created_at"))?,
            updated_at: parse_datetime(row.get("updated_at"))?,
        })
    }
}

fn storage_err(e: sqlx::Error) -> ConnectorError {
    ConnectorError::Storage(e.to_string())
}

fn parse_uuid(raw: String) -> ConnectorResult<Uuid> {
    Uuid::parse_str(&raw).map_err(|_| ConnectorError::Storage("corrupt id column".into()))
}

fn parse_datetime(raw: String) -> ConnectorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ConnectorError::Storage("corrupt timestamp column".into()))
}

fn parse_optional_datetime(raw: Option<String>) -> ConnectorResult<Option<DateTime<Utc>>> {
    raw.map(parse_datetime).transpose()
}

#[async_trait]
impl ConnectionStore for SqliteConnectionStore {
    async fn get_personal(
        &self,
        user_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<Option<PersonalConnection>> {
        let row = sqlx::query(
            "SELECT user_id, connector_key, encrypted_token, expires_at, scope,
                    created_at, updated_at
             FROM personal_connections
             WHERE user_id = ?1 AND connector_key = ?2",
        )
        .bind(user_id.to_string())
        .bind(connector_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(Self::personal_from_row).transpose()
    }

    async fn put_personal(&self, connection: &PersonalConnection) -> ConnectorResult<()> {
        sqlx::query(
            "INSERT INTO personal_connections
                 (user_id, connector_key, encrypted_token, expires_at, scope,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, connector_key) DO UPDATE SET
                 encrypted_token = excluded.encrypted_token,
                 expires_at = excluded.expires_at,
                 scope = excluded.scope,
                 updated_at = excluded.updated_at",
        )
        .bind(connection.user_id.to_string())
        .bind(&connection.connector_key)
        .bind(&connection.encrypted_token)
        .bind(connection.expires_at.map(|dt| dt.to_rfc3339()))
        .bind(&connection.scope)
        .bind(connection.created_at.to_rfc3339())
        .bind(connection.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn delete_personal(&self, user_id: Uuid, connector_key: &str) -> ConnectorResult<bool> {
        let result = sqlx::query(
            "DELETE FROM personal_connections WHERE user_id = ?1 AND connector_key = ?2",
        )
        .bind(user_id.to_string())
        .bind(connector_key)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_shared(
        &self,
        project_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<Option<SharedConnection>> {
        let row = sqlx::query(
            "SELECT project_id, connector_key, encrypted_credential, created_at, updated_at
             FROM shared_connections
             WHERE project_id = ?1 AND connector_key = ?2",
        )
        .bind(project_id.to_string())
        .bind(connector_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(Self::shared_from_row).transpose()
    }

    async fn put_shared(&self, connection: &SharedConnection) -> ConnectorResult<()> {
        sqlx::query(
            "INSERT INTO shared_connections
                 (project_id, connector_key, encrypted_credential, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(project_id, connector_key) DO UPDATE SET
                 encrypted_credential = excluded.encrypted_credential,
                 updated_at = excluded.updated_at",
        )
        .bind(connection.project_id.to_string())
        .bind(&connection.connector_key)
        .bind(&connection.encrypted_credential)
        .bind(connection.created_at.to_rfc3339())
        .bind(connection.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn delete_shared(&self, project_id: Uuid, connector_key: &str) -> ConnectorResult<bool> {
        let result = sqlx::query(
            "DELETE FROM shared_connections WHERE project_id = ?1 AND connector_key = ?2",
        )
        .bind(project_id.to_string())
        .bind(connector_key)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }
}
