//! Server configuration and shared request state.
//!
//! Everything shared between requests is immutable after startup except the
//! store, which handles its own concurrency.

use std::sync::Arc;

use crate::error::ShareError;
use crate::identity::IdentityVerifier;
use crate::share::token::TokenService;
use crate::store::ProfileStore;

/// Default listening port.
const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ShareConfig {
    pub port: u16,
    /// Origin used to build share links (no trailing slash needed).
    pub public_origin: String,
    /// HMAC secret for share tokens.
    pub token_secret: String,
    /// Identity assertion verification credential (RSA PEM or HMAC secret).
    pub identity_key: String,
    pub identity_issuer: Option<String>,
    pub identity_audience: Option<String>,
    /// Directory for persisting mappings and profiles. None = in-memory.
    pub data_dir: Option<String>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            public_origin: format!("http://localhost:{DEFAULT_PORT}"),
            token_secret: String::new(),
            identity_key: String::new(),
            identity_issuer: None,
            identity_audience: None,
            data_dir: None,
        }
    }
}

/// Shared server state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub identity: IdentityVerifier,
    pub store: Arc<dyn ProfileStore>,
    /// Share link origin with any trailing slash removed.
    pub public_origin: String,
}

impl AppState {
    /// Build the state from configuration and a store.
    ///
    /// Fails if either secret is missing or unusable; callers treat that as
    /// fatal at startup.
    pub fn new(config: &ShareConfig, store: Arc<dyn ProfileStore>) -> Result<Self, ShareError> {
        let tokens = TokenService::new(&config.token_secret)?;
        let identity = IdentityVerifier::new(
            &config.identity_key,
            config.identity_issuer.as_deref(),
            config.identity_audience.as_deref(),
        )?;

        Ok(Self {
            tokens,
            identity,
            store,
            public_origin: config.public_origin.trim_end_matches('/').to_string(),
        })
    }

    /// Shareable link for a key/token pair: `<origin>/e/<key>?t=<token>`.
    pub fn share_url(&self, key: &str, token: &str) -> String {
        format!(
            "{}/e/{}?t={}",
            self.public_origin,
            urlencoding::encode(key),
            urlencoding::encode(token)
        )
    }
}
