// ABOUTME: AEAD envelope encryption for opaque secret blobs
// ABOUTME: Implements the salt||iv||tag||ciphertext storage format with per-call key derivation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Envelope encryption.
//!
//! Each call derives a fresh AES-256-GCM key via HKDF-SHA256 from the master
//! key and a random per-call salt, then seals with a random IV and a detached
//! authentication tag. The stored form is
//! `base64(salt ‖ iv ‖ auth_tag ‖ ciphertext)` with fixed field lengths, so
//! two encryptions of identical plaintext are unlinkable.

use base64::{engine::general_purpose, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::hkdf::{Salt, HKDF_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroize;

use super::{CryptoError, MasterKey};

/// Length of the per-call HKDF salt in bytes
const SALT_LEN: usize = 16;
/// Length of the AES-GCM initialization vector in bytes
const IV_LEN: usize = 12;
/// Length of the GCM authentication tag in bytes
const TAG_LEN: usize = 16;
/// Length of the derived AEAD key in bytes
const DERIVED_KEY_LEN: usize = 32;

/// Domain-separation info for HKDF expansion
const HKDF_INFO: &[u8] = b"mosaic-connectors/envelope/v1";

/// Symmetric authenticated encryption for credential material.
///
/// Stateless per call aside from the shared master key; safe for unlimited
/// concurrent use.
pub struct EncryptionService {
    master: MasterKey,
    rng: SystemRandom,
}

impl EncryptionService {
    /// Create a service around a loaded master key
    #[must_use]
    pub fn new(master: MasterKey) -> Self {
        Self {
            master,
            rng: SystemRandom::new(),
        }
    }

    /// Encrypt a plaintext string into a base64 envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if random generation or sealing
    /// fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| CryptoError::Encryption("salt generation failed".into()))?;

        let mut iv = [0u8; IV_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| CryptoError::Encryption("iv generation failed".into()))?;

        let key = self.derive_key(&salt)?;
        let nonce = Nonce::assume_unique_for_key(iv);

        let mut in_out = plaintext.as_bytes().to_vec();
        let tag = key
            .seal_in_place_separate_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                in_out.zeroize();
                CryptoError::Encryption("sealing failed".into())
            })?;

        let mut envelope = Vec::with_capacity(SALT_LEN + IV_LEN + TAG_LEN + in_out.len());
        envelope.extend_from_slice(&salt);
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(tag.as_ref());
        envelope.extend_from_slice(&in_out);

        Ok(general_purpose::STANDARD.encode(envelope))
    }

    /// Decrypt a base64 envelope back into plaintext.
    ///
    /// Fails closed: a bad tag, a truncated envelope, or invalid UTF-8 all
    /// return [`CryptoError::Decryption`] and never partial plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] on any format or authentication
    /// failure.
    pub fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let raw = general_purpose::STANDARD
            .decode(envelope)
            .map_err(|_| CryptoError::Decryption("envelope is not valid base64".into()))?;

        if raw.len() < SALT_LEN + IV_LEN + TAG_LEN {
            return Err(CryptoError::Decryption("envelope too short".into()));
        }

        let (salt, rest) = raw.split_at(SALT_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let key = self
            .derive_key(salt)
            .map_err(|_| CryptoError::Decryption("key derivation failed".into()))?;

        let iv_bytes: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| CryptoError::Decryption("invalid iv length".into()))?;
        let nonce = Nonce::assume_unique_for_key(iv_bytes);

        // ring expects ciphertext || tag for open_in_place
        let mut in_out = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        in_out.extend_from_slice(ciphertext);
        in_out.extend_from_slice(tag);

        let plaintext_len = match key.open_in_place(nonce, Aad::empty(), &mut in_out) {
            Ok(plaintext) => plaintext.len(),
            Err(_) => {
                in_out.zeroize();
                return Err(CryptoError::Decryption("authentication failed".into()));
            }
        };

        in_out.truncate(plaintext_len);
        let result = String::from_utf8(in_out.clone());
        in_out.zeroize();
        result.map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".into()))
    }

    /// Serialize a structured secret to JSON, then encrypt it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if serialization or encryption
    /// fails.
    pub fn encrypt_credentials<T: Serialize>(&self, credentials: &T) -> Result<String, CryptoError> {
        let mut json = serde_json::to_string(credentials)
            .map_err(|_| CryptoError::Encryption("credential serialization failed".into()))?;
        let envelope = self.encrypt(&json);
        json.zeroize();
        envelope
    }

    /// Decrypt an envelope and deserialize the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] on any decrypt or deserialize
    /// failure.
    pub fn decrypt_credentials<T: DeserializeOwned>(
        &self,
        envelope: &str,
    ) -> Result<T, CryptoError> {
        let mut json = self.decrypt(envelope)?;
        let result = serde_json::from_str(&json);
        json.zeroize();
        result.map_err(|_| CryptoError::Decryption("credential payload malformed".into()))
    }

    /// Derive the per-call AEAD key from the master key and salt
    fn derive_key(&self, salt: &[u8]) -> Result<LessSafeKey, CryptoError> {
        let prk = Salt::new(HKDF_SHA256, salt).extract(self.master.as_bytes());
        let info = [HKDF_INFO];
        let okm = prk
            .expand(&info, HKDF_SHA256)
            .map_err(|_| CryptoError::Encryption("key derivation failed".into()))?;

        let mut key_bytes = [0u8; DERIVED_KEY_LEN];
        okm.fill(&mut key_bytes)
            .map_err(|_| CryptoError::Encryption("key derivation failed".into()))?;

        let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes)
            .map_err(|_| CryptoError::Encryption("key construction failed".into()));
        key_bytes.zeroize();

        Ok(LessSafeKey::new(unbound?))
    }
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionService(..)")
    }
}
