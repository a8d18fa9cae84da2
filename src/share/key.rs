//! Public share keys.
//!
//! A public key is the opaque identifier embedded in a share link. It has the
//! shape `HID-` followed by 8–64 characters from `[A-Z0-9_-]`, which also makes
//! it safe to use as a file name in the disk-backed store.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Prefix carried by every public key.
pub const KEY_PREFIX: &str = "HID-";

/// Minimum length of the body after the prefix.
pub const KEY_BODY_MIN: usize = 8;

/// Maximum length of the body after the prefix.
pub const KEY_BODY_MAX: usize = 64;

/// Random bytes drawn per generated key (encodes to 16 characters).
const KEY_ENTROPY_BYTES: usize = 12;

/// A validated public share key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

/// Why a string was rejected as a public key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFormatError {
    #[error("public key must start with HID-")]
    MissingPrefix,
    #[error("public key body must be 8-64 characters, got {0}")]
    BadLength(usize),
    #[error("public key may only contain A-Z, 0-9, '_' and '-'")]
    BadCharacter,
}

impl PublicKey {
    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let body = URL_SAFE_NO_PAD.encode(bytes).to_ascii_uppercase();
        Self(format!("{KEY_PREFIX}{body}"))
    }

    /// Parse and validate a key string exactly as given (no trimming, no case folding).
    pub fn parse(raw: &str) -> Result<Self, KeyFormatError> {
        let body = raw
            .strip_prefix(KEY_PREFIX)
            .ok_or(KeyFormatError::MissingPrefix)?;

        if body.len() < KEY_BODY_MIN || body.len() > KEY_BODY_MAX {
            return Err(KeyFormatError::BadLength(body.len()));
        }

        if !body
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
        {
            return Err(KeyFormatError::BadCharacter);
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}
