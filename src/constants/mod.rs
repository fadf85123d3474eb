// ABOUTME: Application constants for connector keys, endpoints, timeouts, and limits
// ABOUTME: Single source of truth for values shared between adapters, manager, and gateway
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Centralized constants. Endpoint defaults can be overridden per connector
//! via `MOSAIC_<KEY>_*` environment variables (see [`crate::config`]).

/// Registry keys for the built-in connectors
pub mod connector_keys {
    /// Notion workspace connector (personal)
    pub const NOTION: &str = "NOTION";
    /// Linear issue tracker connector (personal)
    pub const LINEAR: &str = "LINEAR";
    /// Stripe platform connector (shared)
    pub const STRIPE: &str = "STRIPE";
    /// Resend email platform connector (shared)
    pub const RESEND: &str = "RESEND";
    /// Synthetic personal connector for development and tests
    pub const SYNTHETIC_PERSONAL: &str = "SYNTHETIC_PERSONAL";
    /// Synthetic shared connector for development and tests
    pub const SYNTHETIC_SHARED: &str = "SYNTHETIC_SHARED";
}

/// Default provider endpoint URLs
pub mod endpoints {
    /// Notion OAuth authorization endpoint
    pub const NOTION_AUTH_URL: &str = "https://api.notion.com/v1/oauth/authorize";
    /// Notion OAuth token endpoint
    pub const NOTION_TOKEN_URL: &str = "https://api.notion.com/v1/oauth/token";
    /// Notion API base URL
    pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";
    /// Notion API version header value
    pub const NOTION_API_VERSION: &str = "2022-06-28";

    /// Linear OAuth authorization endpoint
    pub const LINEAR_AUTH_URL: &str = "https://linear.app/oauth/authorize";
    /// Linear OAuth token endpoint
    pub const LINEAR_TOKEN_URL: &str = "https://api.linear.app/oauth/token";
    /// Linear API base URL (GraphQL)
    pub const LINEAR_API_BASE_URL: &str = "https://api.linear.app";

    /// Stripe API base URL
    pub const STRIPE_API_BASE_URL: &str = "https://api.stripe.com";

    /// Resend API base URL
    pub const RESEND_API_BASE_URL: &str = "https://api.resend.com";
}

/// Timeouts and lifecycle margins
pub mod timeouts {
    /// Per-request timeout for all provider HTTP calls, in seconds
    pub const PROVIDER_HTTP_TIMEOUT_SECS: u64 = 10;

    /// Refresh tokens this many seconds before the recorded expiry
    pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

    /// Pending authorization state expires after this many minutes
    pub const AUTH_STATE_TTL_MINUTES: i64 = 10;
}

/// Pagination limits for resource queries
pub mod limits {
    /// Page size used when a query does not specify one
    pub const DEFAULT_PAGE_SIZE: usize = 50;

    /// Upper bound applied to caller-supplied page sizes
    pub const MAX_PAGE_SIZE: usize = 200;
}

/// Environment variable names for process-wide configuration
pub mod env_vars {
    /// Base64-encoded 32-byte master encryption key
    pub const MASTER_KEY: &str = "MOSAIC_MASTER_KEY";
}
