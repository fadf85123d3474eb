// ABOUTME: Cryptography module providing envelope encryption for credential material
// ABOUTME: Centralizes master key handling and AEAD envelope encode/decode
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Cryptographic utilities for credential storage.
//!
//! Everything persisted by this crate goes through [`EncryptionService`]; the
//! only stored representation of a secret is the base64 envelope
//! `salt ‖ iv ‖ auth_tag ‖ ciphertext`.

pub mod envelope;
pub mod keys;

pub use envelope::EncryptionService;
pub use keys::MasterKey;

use thiserror::Error;

/// Crypto failure taxonomy, distinct from transport and provider errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed (random generation or sealing)
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed: malformed envelope or authentication failure.
    /// Always fails closed; no partial plaintext is ever returned.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Master key material is missing or malformed
    #[error("invalid master key: {0}")]
    InvalidKey(String),
}
