// ABOUTME: Library entry point for the Mosaic connector registry
// ABOUTME: Pluggable third-party integrations with encrypted credential lifecycle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

#![deny(unsafe_code)]

//! # Mosaic Connectors
//!
//! The integration layer that connects Mosaic - and the applications it
//! generates - to third-party services. Two kinds of connector live behind
//! one catalog:
//!
//! - **Personal connectors** (Notion, Linear): authorized individually by an
//!   end user through an OAuth round-trip.
//! - **Shared connectors** (Stripe, Resend): configured once per project with
//!   a service credential used on behalf of all of that app's users.
//!
//! All credential material is encrypted at rest with authenticated
//! encryption; the only persisted form is the envelope
//! `base64(salt ‖ iv ‖ auth_tag ‖ ciphertext)`. Token refresh happens on
//! demand when a query finds a token expired or about to expire.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mosaic_connectors::connectors::registry::ConnectorRegistry;
//! use mosaic_connectors::crypto::{EncryptionService, MasterKey};
//! use mosaic_connectors::gateway::{ResourceGateway, Scope};
//! use mosaic_connectors::manager::ConnectionManager;
//! use mosaic_connectors::models::ResourceQuery;
//! use mosaic_connectors::storage::SqliteConnectionStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let crypto = Arc::new(EncryptionService::new(MasterKey::from_env()?));
//! let registry = Arc::new(ConnectorRegistry::with_default_connectors()?);
//! let store = Arc::new(SqliteConnectionStore::new("sqlite:connections.db?mode=rwc").await?);
//!
//! let manager = Arc::new(ConnectionManager::new(registry, store, crypto));
//! let gateway = ResourceGateway::new(Arc::clone(&manager));
//!
//! let user_id = uuid::Uuid::new_v4();
//! let auth = manager
//!     .initiate_authorization(user_id, "NOTION", "https://app.mosaic.dev/callback")
//!     .await?;
//! println!("authorize at: {}", auth.authorization_url);
//!
//! // ... after the provider redirects back with (code, state):
//! let connection = manager.complete_authorization("<code>", &auth.state).await?;
//! let page = gateway
//!     .query_page("NOTION", Scope::User(connection.user_id), &ResourceQuery::search("roadmap"))
//!     .await?;
//! println!("found {} resources", page.resources.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`connectors`]: capability contracts, the registry, and the per-provider
//!   adapters
//! - [`crypto`]: master key handling and envelope encryption
//! - [`manager`]: OAuth state machine and credential lifecycle
//! - [`gateway`]: provider-agnostic resource queries and lazy streaming
//! - [`storage`]: connection store trait with memory and SQLite backends

/// Environment-based configuration for connectors and secrets
pub mod config;

/// Connector contracts, registry, and provider adapters
pub mod connectors;

/// Application constants and default endpoint values
pub mod constants;

/// Cryptographic utilities and envelope encryption
pub mod crypto;

/// Unified error handling with typed failure taxonomy
pub mod errors;

/// Provider-agnostic resource query gateway
pub mod gateway;

/// Structured logging configuration
pub mod logging;

/// Connection lifecycle orchestration
pub mod manager;

/// Shared domain models
pub mod models;

/// Connection storage backends
pub mod storage;
