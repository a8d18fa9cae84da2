//! Access tokens bound to a public key.
//!
//! Tokens are compact HS256 JWTs carrying `{ key, iat, exp }`. They are never
//! stored: a token is valid iff its signature checks out, it has not expired,
//! and the key inside it is the key being requested.
//!
//! Verification order is fixed: signature (and algorithm), then expiry, then
//! key binding. Expiry is checked here with no leeway rather than by the JWT
//! library, so tests can pin the clock.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::key::PublicKey;
use crate::error::ShareError;

/// Fixed validity window for share tokens (3 hours).
pub const TOKEN_TTL_SECS: i64 = 3 * 3600;

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Claims carried inside a share token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareClaims {
    /// The public key this token unlocks.
    pub key: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration time (Unix seconds).
    pub exp: i64,
}

/// Why a token was refused. Never shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Unparseable, tampered with, or signed with another algorithm/secret.
    #[error("token is malformed or its signature is invalid")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token is bound to a different key")]
    KeyMismatch,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and verifies share tokens with a server-held HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service.
    ///
    /// Returns a configuration error if the secret is empty or shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &str) -> Result<Self, ShareError> {
        if secret.is_empty() {
            return Err(ShareError::Config("token secret is required".into()));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ShareError::Config(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        // Only HS256 is accepted; `Validation::new` pins the algorithm list.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Issue a token for `key`, valid for [`TOKEN_TTL_SECS`] from now.
    pub fn issue(&self, key: &PublicKey) -> Result<IssuedToken, ShareError> {
        self.issue_at(key, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, key: &PublicKey, now: i64) -> Result<IssuedToken, ShareError> {
        let claims = ShareClaims {
            key: key.as_str().to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ShareError::Internal(format!("failed to sign token: {e}")))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify `token` against the key it is being presented for.
    pub fn verify(&self, token: &str, expected: &PublicKey) -> Result<ShareClaims, TokenError> {
        self.verify_at(token, expected, Utc::now().timestamp())
    }

    /// Verify as if the current time were `now` (Unix seconds).
    pub fn verify_at(
        &self,
        token: &str,
        expected: &PublicKey,
        now: i64,
    ) -> Result<ShareClaims, TokenError> {
        let claims = decode::<ShareClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Malformed)?
            .claims;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.key != expected.as_str() {
            return Err(TokenError::KeyMismatch);
        }

        Ok(claims)
    }
}
