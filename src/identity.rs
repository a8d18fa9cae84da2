//! Owner identity assertions.
//!
//! Owners prove who they are with a signed JWT in the `Authorization: Bearer`
//! header, issued by the app's identity provider. The verification credential
//! is either a PEM-encoded RSA public key (RS256) or a shared secret (HS256);
//! exactly one algorithm is accepted per deployment. The owner id is the
//! token's `sub` claim.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::ShareError;
use crate::share::token::MIN_SECRET_LEN;

/// Claims we read from an identity assertion.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
}

/// Verifies identity assertions and yields the owner id.
#[derive(Clone)]
pub struct IdentityVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    /// Build a verifier from the configured credential.
    ///
    /// A credential starting with `-----BEGIN` is parsed as an RSA public key,
    /// anything else is used as an HMAC secret.
    pub fn new(
        credential: &str,
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> Result<Self, ShareError> {
        let credential = credential.trim();
        let (decoding, algorithm) = if credential.starts_with("-----BEGIN") {
            let key = DecodingKey::from_rsa_pem(credential.as_bytes())
                .map_err(|e| ShareError::Config(format!("invalid identity public key: {e}")))?;
            (key, Algorithm::RS256)
        } else {
            if credential.len() < MIN_SECRET_LEN {
                return Err(ShareError::Config(format!(
                    "identity secret must be at least {MIN_SECRET_LEN} bytes"
                )));
            }
            (DecodingKey::from_secret(credential.as_bytes()), Algorithm::HS256)
        };

        let mut required = vec!["exp", "sub"];
        required.extend(issuer.map(|_| "iss"));
        required.extend(audience.map(|_| "aud"));

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&required);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding,
            validation,
        })
    }

    /// Verify an assertion and return the owner id.
    pub fn verify(&self, assertion: &str) -> Result<String, ShareError> {
        let claims = decode::<IdentityClaims>(assertion, &self.decoding, &self.validation)
            .map_err(|e| ShareError::Authentication(format!("identity assertion rejected: {e}")))?
            .claims;

        let owner_id = claims.sub.trim();
        if owner_id.is_empty() {
            return Err(ShareError::Authentication(
                "identity assertion has an empty subject".into(),
            ));
        }
        Ok(owner_id.to_string())
    }

    /// Authenticate a request from its `Authorization` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<String, ShareError> {
        let header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let assertion = bearer_token(header)
            .ok_or_else(|| ShareError::Authentication("missing bearer token".into()))?;
        self.verify(assertion)
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
