// ABOUTME: Master encryption key loading and lifecycle management
// ABOUTME: Loads the process-wide 32-byte secret from the environment, zeroized on drop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Master key management.
//!
//! The master key is process-wide configuration state: loaded once at
//! startup, never logged, never serialized. A missing or malformed key is a
//! fatal configuration error; the process must not serve traffic without it.

use base64::{engine::general_purpose, Engine as _};
use std::env;
use tracing::info;
use zeroize::Zeroize;

use super::CryptoError;
use crate::constants::env_vars;

/// Length of the master key in bytes (256 bits)
pub const MASTER_KEY_LEN: usize = 32;

/// Process-wide master encryption key.
///
/// Key bytes are zeroized when the value is dropped.
pub struct MasterKey {
    key: [u8; MASTER_KEY_LEN],
}

impl MasterKey {
    /// Create a key from raw bytes - primarily for tests
    #[must_use]
    pub const fn from_bytes(key: [u8; MASTER_KEY_LEN]) -> Self {
        Self { key }
    }

    /// Load the master key from `MOSAIC_MASTER_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the variable is unset, is not
    /// valid base64, or does not decode to exactly 32 bytes.
    pub fn from_env() -> Result<Self, CryptoError> {
        let encoded = env::var(env_vars::MASTER_KEY).map_err(|_| {
            CryptoError::InvalidKey(format!("{} is not set", env_vars::MASTER_KEY))
        })?;
        let key = Self::decode(&encoded)?;
        info!("Master encryption key loaded from environment");
        Ok(key)
    }

    /// Parse a base64-encoded master key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] on bad base64 or wrong length.
    /// The error message never includes the supplied material.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let mut key_bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::InvalidKey("master key is not valid base64".into()))?;

        if key_bytes.len() != MASTER_KEY_LEN {
            let got = key_bytes.len();
            key_bytes.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "master key must be exactly {MASTER_KEY_LEN} bytes, got {got}"
            )));
        }

        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(&key_bytes);
        key_bytes.zeroize();
        Ok(Self { key })
    }

    /// Generate a fresh random key - for tests and provisioning tooling
    #[must_use]
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut key = [0u8; MASTER_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Raw key bytes for key derivation
    #[must_use]
    pub(crate) const fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.key
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

// No Debug derive: key material must never reach logs or error messages.
impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    #[test]
    fn test_decode_valid_key() {
        let encoded = general_purpose::STANDARD.encode([7u8; 32]);
        let key = MasterKey::decode(&encoded).expect("valid key");
        assert_eq!(key.as_bytes(), &[7u8; 32]);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let short = general_purpose::STANDARD.encode([0u8; 16]);
        assert!(MasterKey::decode(&short).is_err());

        let long = general_purpose::STANDARD.encode([0u8; 64]);
        assert!(MasterKey::decode(&long).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(MasterKey::decode("not-base64!@#").is_err());
    }

    #[test]
    fn test_generate_produces_distinct_keys() {
        let a = MasterKey::generate();
        let b = MasterKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = MasterKey::from_bytes([9u8; 32]);
        assert_eq!(format!("{key:?}"), "MasterKey(..)");
    }
}
