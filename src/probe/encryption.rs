//! Encryption subsystem status collaborator
//!
//! The health report embeds the encryption subsystem's self-reported state.
//! `KeyEncryptionStatus` is the production source: it validates the
//! configured AES-256-GCM key and runs a seal/open round-trip with it.

use crate::probe::report::EncryptionStatus;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

pub const ALGORITHM: &str = "aes-256-gcm";

/// Key length in bytes (256 bits)
pub const KEY_LENGTH: usize = 32;

/// Environment variable holding the hex-encoded key
pub const ENCRYPTION_KEY_VAR: &str = "ENCRYPTION_KEY";

const DEV_KEY_SEED: &[u8] = b"dev-encryption-key-not-for-production";
const SELF_TEST_PLAINTEXT: &[u8] = b"vigil encryption self-test payload";

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("ENCRYPTION_KEY must be set in production")]
    MissingKey,

    #[error("ENCRYPTION_KEY must be a {}-character hexadecimal string", KEY_LENGTH * 2)]
    InvalidKey,

    #[error("encryption round-trip failed")]
    SelfTest,
}

/// Collaborator that reports encryption readiness
///
/// Implementations never fail; problems are expressed through the status
/// flags.
pub trait EncryptionStatusSource: Send + Sync {
    fn status(&self) -> EncryptionStatus;
}

/// Status source backed by a hex key from configuration
///
/// Outside production a missing key falls back to a deterministic development
/// key so the self-test still exercises the cipher; `keySet` stays false and
/// the subsystem is reported as not enabled.
pub struct KeyEncryptionStatus {
    key_hex: Option<String>,
    environment: String,
}

impl KeyEncryptionStatus {
    pub fn new(key_hex: Option<String>, environment: impl Into<String>) -> Self {
        Self {
            key_hex: key_hex.filter(|k| !k.is_empty()),
            environment: environment.into(),
        }
    }

    /// Read the key from `ENCRYPTION_KEY`
    pub fn from_env(environment: impl Into<String>) -> Self {
        Self::new(std::env::var(ENCRYPTION_KEY_VAR).ok(), environment)
    }

    fn resolve_key(&self) -> Result<[u8; KEY_LENGTH], EncryptionError> {
        match &self.key_hex {
            Some(hex) => decode_key_hex(hex),
            None if self.environment == "production" => Err(EncryptionError::MissingKey),
            None => {
                let mut key = [0u8; KEY_LENGTH];
                key.copy_from_slice(digest(&SHA256, DEV_KEY_SEED).as_ref());
                Ok(key)
            }
        }
    }
}

impl EncryptionStatusSource for KeyEncryptionStatus {
    fn status(&self) -> EncryptionStatus {
        let key_set = self.key_hex.is_some();
        let key = self.resolve_key();
        let key_valid = key.is_ok();
        let test_passed = key.map(|k| round_trip(&k).is_ok()).unwrap_or(false);

        EncryptionStatus {
            enabled: key_set && key_valid && test_passed,
            key_set,
            key_valid,
            test_passed,
            algorithm: ALGORITHM.to_string(),
            key_length: KEY_LENGTH,
            environment: self.environment.clone(),
        }
    }
}

fn decode_key_hex(hex: &str) -> Result<[u8; KEY_LENGTH], EncryptionError> {
    if hex.len() != KEY_LENGTH * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EncryptionError::InvalidKey);
    }

    let mut key = [0u8; KEY_LENGTH];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| EncryptionError::InvalidKey)?;
    }
    Ok(key)
}

/// Seal and reopen a fixed payload with a fresh nonce
fn round_trip(key: &[u8; KEY_LENGTH]) -> Result<(), EncryptionError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| EncryptionError::SelfTest)?;
    let key = LessSafeKey::new(unbound);

    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| EncryptionError::SelfTest)?;

    let mut in_out = SELF_TEST_PLAINTEXT.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce),
        Aad::empty(),
        &mut in_out,
    )
    .map_err(|_| EncryptionError::SelfTest)?;

    let opened = key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| EncryptionError::SelfTest)?;

    if opened != SELF_TEST_PLAINTEXT {
        return Err(EncryptionError::SelfTest);
    }
    Ok(())
}
