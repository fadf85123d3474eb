// ABOUTME: In-memory connection store backed by DashMap
// ABOUTME: Used for tests, development, and single-process deployments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::ConnectionStore;
use crate::errors::ConnectorResult;
use crate::models::{PersonalConnection, SharedConnection};

/// Lock-free in-memory store. Entry insertion replaces the whole row, which
/// satisfies the atomic-replace contract.
#[derive(Default)]
pub struct MemoryConnectionStore {
    personal: DashMap<(Uuid, String), PersonalConnection>,
    shared: DashMap<(Uuid, String), SharedConnection>,
}

impl MemoryConnectionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn get_personal(
        &self,
        user_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<Option<PersonalConnection>> {
        Ok(self
            .personal
            .get(&(user_id, connector_key.to_owned()))
            .map(|entry| entry.value().clone()))
    }

    async fn put_personal(&self, connection: &PersonalConnection) -> ConnectorResult<()> {
        self.personal.insert(
            (connection.user_id, connection.connector_key.clone()),
            connection.clone(),
        );
        Ok(())
    }

    async fn delete_personal(&self, user_id: Uuid, connector_key: &str) -> ConnectorResult<bool> {
        Ok(self
            .personal
            .remove(&(user_id, connector_key.to_owned()))
            .is_some())
    }

    async fn get_shared(
        &self,
        project_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<Option<SharedConnection>> {
        Ok(self
            .shared
            .get(&(project_id, connector_key.to_owned()))
            .map(|entry| entry.value().clone()))
    }

    async fn put_shared(&self, connection: &SharedConnection) -> ConnectorResult<()> {
        self.shared.insert(
            (connection.project_id, connection.connector_key.clone()),
            connection.clone(),
        );
        Ok(())
    }

    async fn delete_shared(&self, project_id: Uuid, connector_key: &str) -> ConnectorResult<bool> {
        Ok(self
            .shared
            .remove(&(project_id, connector_key.to_owned()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_personal_roundtrip_and_overwrite() {
        let store = MemoryConnectionStore::new();
        let user_id = Uuid::new_v4();

        let mut connection = PersonalConnection::new(
            user_id,
            "NOTION".into(),
            "envelope-1".into(),
            None,
            None,
        );
        store.put_personal(&connection).await.expect("put");

        connection.replace_token("envelope-2".into(), None, None);
        store.put_personal(&connection).await.expect("replace");

        let fetched = store
            .get_personal(user_id, "NOTION")
            .await
            .expect("get")
            .expect("row");
        assert_eq!(fetched.encrypted_token, "envelope-2");

        assert!(store.delete_personal(user_id, "NOTION").await.expect("delete"));
        assert!(!store.delete_personal(user_id, "NOTION").await.expect("delete"));
        assert!(!store.personal_exists(user_id, "NOTION").await.expect("exists"));
    }
}
