// ABOUTME: Storage boundary for encrypted connection records
// ABOUTME: ConnectionStore trait with in-memory and SQLite implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! # Connection Storage
//!
//! The registry core needs only get/put/delete/exists by composite key.
//! `put_*` is a whole-row atomic replace: two refreshes racing on the same
//! `(user, connector)` pair each write a complete valid row and the last
//! write wins - partial, field-by-field updates are not part of the
//! contract.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryConnectionStore;
pub use sqlite::SqliteConnectionStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ConnectorResult;
use crate::models::{PersonalConnection, SharedConnection};

/// Key-value storage for encrypted connection rows.
///
/// Implementations must make each put an atomic replace of the full row.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Fetch a personal connection by `(user, connector)`
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure. A missing row is `Ok(None)`, not an error.
    async fn get_personal(
        &self,
        user_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<Option<PersonalConnection>>;

    /// Insert or atomically replace a personal connection row
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure.
    async fn put_personal(&self, connection: &PersonalConnection) -> ConnectorResult<()>;

    /// Delete a personal connection; returns whether a row existed
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure.
    async fn delete_personal(&self, user_id: Uuid, connector_key: &str) -> ConnectorResult<bool>;

    /// Whether a personal connection exists for `(user, connector)`
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure.
    async fn personal_exists(&self, user_id: Uuid, connector_key: &str) -> ConnectorResult<bool> {
        Ok(self.get_personal(user_id, connector_key).await?.is_some())
    }

    /// Fetch a shared connection by `(project, connector)`
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure. A missing row is `Ok(None)`, not an error.
    async fn get_shared(
        &self,
        project_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<Option<SharedConnection>>;

    /// Insert or atomically replace a shared connection row
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure.
    async fn put_shared(&self, connection: &SharedConnection) -> ConnectorResult<()>;

    /// Delete a shared connection; returns whether a row existed
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`](crate::errors::ConnectorError::Storage)
    /// on backend failure.
    async fn delete_shared(&self, project_id: Uuid, connector_key: &str) -> ConnectorResult<bool>;
}
