// ABOUTME: Process-wide connector catalog keyed by connector identifier
// ABOUTME: Registration with duplicate rejection, typed lookup, and enumeration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! # Connector Registry
//!
//! Built once during startup by registering every known connector definition
//! sequentially; read-only thereafter, so it is shared across request
//! handlers behind an `Arc` without locking.
//!
//! Personal and shared connectors live in separate maps, but the key space is
//! flat across both variants: registering `"STRIPE"` as personal after it
//! exists as shared is a configuration error. Lookups return typed errors -
//! "connector not configured" must stay distinguishable from legitimate empty
//! states such as a zero-resource query result.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{ConnectorMetadata, PersonalConnector, SharedConnector};
use crate::errors::{ConnectorError, ConnectorResult};

/// Catalog of all registered connector definitions
#[derive(Default)]
pub struct ConnectorRegistry {
    personal: HashMap<String, Arc<dyn PersonalConnector>>,
    shared: HashMap<String, Arc<dyn SharedConnector>>,
}

impl ConnectorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated with every feature-enabled built-in
    /// connector, configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when a built-in connector is
    /// missing required configuration, or [`ConnectorError::DuplicateConnector`]
    /// on a key collision. Both are startup-fatal.
    pub fn with_default_connectors() -> ConnectorResult<Self> {
        let mut registry = Self::new();

        Self::register_notion(&mut registry)?;
        Self::register_linear(&mut registry)?;
        Self::register_stripe(&mut registry)?;
        Self::register_resend(&mut registry)?;
        Self::register_synthetic(&mut registry)?;

        let mut catalog: Vec<&str> = registry
            .personal
            .keys()
            .chain(registry.shared.keys())
            .map(String::as_str)
            .collect();
        catalog.sort_unstable();
        info!(
            "Connector registry initialized with {} connector(s): [{}]",
            catalog.len(),
            catalog.join(", ")
        );

        Ok(registry)
    }

    #[cfg(feature = "connector-notion")]
    fn register_notion(registry: &mut Self) -> ConnectorResult<()> {
        registry.register_personal(Arc::new(super::notion::NotionConnector::from_env()?))
    }

    #[cfg(not(feature = "connector-notion"))]
    fn register_notion(_registry: &mut Self) -> ConnectorResult<()> {
        Ok(())
    }

    #[cfg(feature = "connector-linear")]
    fn register_linear(registry: &mut Self) -> ConnectorResult<()> {
        registry.register_personal(Arc::new(super::linear::LinearConnector::from_env()?))
    }

    #[cfg(not(feature = "connector-linear"))]
    fn register_linear(_registry: &mut Self) -> ConnectorResult<()> {
        Ok(())
    }

    #[cfg(feature = "connector-stripe")]
    fn register_stripe(registry: &mut Self) -> ConnectorResult<()> {
        registry.register_shared(Arc::new(super::stripe::StripeConnector::from_env()?))
    }

    #[cfg(not(feature = "connector-stripe"))]
    fn register_stripe(_registry: &mut Self) -> ConnectorResult<()> {
        Ok(())
    }

    #[cfg(feature = "connector-resend")]
    fn register_resend(registry: &mut Self) -> ConnectorResult<()> {
        registry.register_shared(Arc::new(super::resend::ResendConnector::from_env()?))
    }

    #[cfg(not(feature = "connector-resend"))]
    fn register_resend(_registry: &mut Self) -> ConnectorResult<()> {
        Ok(())
    }

    #[cfg(feature = "connector-synthetic")]
    fn register_synthetic(registry: &mut Self) -> ConnectorResult<()> {
        registry.register_personal(Arc::new(super::synthetic::SyntheticPersonalConnector::new()))?;
        registry.register_shared(Arc::new(super::synthetic::SyntheticSharedConnector::new()))
    }

    #[cfg(not(feature = "connector-synthetic"))]
    fn register_synthetic(_registry: &mut Self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Register a personal connector definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::DuplicateConnector`] if the key is already
    /// taken by either variant.
    pub fn register_personal(
        &mut self,
        connector: Arc<dyn PersonalConnector>,
    ) -> ConnectorResult<()> {
        let key = connector.metadata().key.clone();
        self.ensure_key_free(&key)?;
        info!("Registering personal connector: {key}");
        self.personal.insert(key, connector);
        Ok(())
    }

    /// Register a shared connector definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::DuplicateConnector`] if the key is already
    /// taken by either variant.
    pub fn register_shared(&mut self, connector: Arc<dyn SharedConnector>) -> ConnectorResult<()> {
        let key = connector.metadata().key.clone();
        self.ensure_key_free(&key)?;
        info!("Registering shared connector: {key}");
        self.shared.insert(key, connector);
        Ok(())
    }

    /// Look up a personal connector by key.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConnectorNotFound`] for an unknown key.
    pub fn get_personal(&self, key: &str) -> ConnectorResult<Arc<dyn PersonalConnector>> {
        self.personal
            .get(key)
            .cloned()
            .ok_or_else(|| ConnectorError::ConnectorNotFound(key.to_owned()))
    }

    /// Look up a shared connector by key.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConnectorNotFound`] for an unknown key.
    pub fn get_shared(&self, key: &str) -> ConnectorResult<Arc<dyn SharedConnector>> {
        self.shared
            .get(key)
            .cloned()
            .ok_or_else(|| ConnectorError::ConnectorNotFound(key.to_owned()))
    }

    /// Enumerate personal connector metadata, sorted by key
    #[must_use]
    pub fn list_personal(&self) -> Vec<ConnectorMetadata> {
        let mut catalog: Vec<ConnectorMetadata> = self
            .personal
            .values()
            .map(|c| c.metadata().clone())
            .collect();
        catalog.sort_by(|a, b| a.key.cmp(&b.key));
        catalog
    }

    /// Enumerate shared connector metadata, sorted by key
    #[must_use]
    pub fn list_shared(&self) -> Vec<ConnectorMetadata> {
        let mut catalog: Vec<ConnectorMetadata> =
            self.shared.values().map(|c| c.metadata().clone()).collect();
        catalog.sort_by(|a, b| a.key.cmp(&b.key));
        catalog
    }

    /// Whether any variant holds the key
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.personal.contains_key(key) || self.shared.contains_key(key)
    }

    fn ensure_key_free(&self, key: &str) -> ConnectorResult<()> {
        if self.contains(key) {
            return Err(ConnectorError::DuplicateConnector(key.to_owned()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("personal", &self.personal.keys().collect::<Vec<_>>())
            .field("shared", &self.shared.keys().collect::<Vec<_>>())
            .finish()
    }
}
