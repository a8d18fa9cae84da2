//! Share REST API handlers.
//!
//! - `POST /mint`        — owner creates/reuses a public key and gets a share link
//! - `GET  /profile`     — link holder fetches the sanitized profile
//! - `PUT  /me/profile`  — owner stores the raw profile document

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::PublicKey;
use super::sanitize::{sanitize, PublicProfile};
use super::token::TOKEN_TTL_SECS;
use crate::error::{Result, ShareError};
use crate::state::AppState;

/// Tokens longer than this are rejected before any parsing.
pub const MAX_TOKEN_LEN: usize = 4096;

/// Largest raw profile document accepted from an owner.
pub const MAX_PROFILE_BYTES: usize = 64 * 1024;

// ── Request / Response Types ─────────────────────────────────────────────────

/// POST /mint body. The whole body is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Key to reuse instead of generating a new one.
    pub public_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub public_key: String,
    pub token: String,
    pub expires_in_seconds: i64,
    pub url: String,
}

/// GET /profile query. Both fields are checked by hand so missing values get
/// the same generic 400 as malformed ones.
#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub key: Option<String>,
    pub t: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    pub key: String,
    pub profile: PublicProfile,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /mint — Create or reuse a public key and issue a share token.
///
/// Authentication happens before the body is even looked at, and the mapping
/// write happens before the token is signed: if the write fails, no token is
/// handed out.
pub async fn mint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MintResponse>> {
    let owner_id = state.identity.authenticate(&headers)?;
    let request = parse_mint_request(&body)?;

    let requested = request
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let key = match requested {
        Some(raw) => PublicKey::parse(raw)
            .map_err(|e| ShareError::Validation(format!("requested key rejected: {e}")))?,
        None => PublicKey::generate(),
    };

    let mapping = state.store.upsert_mapping(&key, &owner_id).await?;
    let issued = state.tokens.issue(&key)?;
    let url = state.share_url(key.as_str(), &issued.token);

    tracing::info!(
        reused = requested.is_some(),
        created_at = %mapping.created_at,
        expires_at = issued.expires_at,
        "[Share] Share link minted"
    );

    Ok(Json(MintResponse {
        public_key: key.to_string(),
        token: issued.token,
        expires_in_seconds: TOKEN_TTL_SECS,
        url,
    }))
}

fn parse_mint_request(body: &[u8]) -> Result<MintRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MintRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ShareError::Validation(format!("invalid mint body: {e}")))
}

/// GET /profile?key=<PublicKey>&t=<Token> — Fetch a sanitized profile.
///
/// Check order: parameter shape, token, mapping, profile. Nothing is read
/// from storage until the token has been verified.
pub async fn fetch_profile(
    State(state): State<AppState>,
    query: std::result::Result<Query<FetchQuery>, QueryRejection>,
) -> Result<Json<FetchResponse>> {
    let Query(query) =
        query.map_err(|e| ShareError::Validation(format!("unreadable query: {e}")))?;
    let (Some(raw_key), Some(token)) = (query.key.as_deref(), query.t.as_deref()) else {
        return Err(ShareError::Validation("key and t are required".into()));
    };

    let key = PublicKey::parse(raw_key)
        .map_err(|e| ShareError::Validation(format!("bad key: {e}")))?;

    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(ShareError::Validation(format!(
            "token length {} out of bounds",
            token.len()
        )));
    }

    state.tokens.verify(token, &key)?;

    let owner_id = state
        .store
        .lookup_owner(&key)
        .await?
        .ok_or_else(|| ShareError::NotFound("no mapping for key".into()))?;

    let raw = state
        .store
        .get_profile(&owner_id)
        .await?
        .ok_or_else(|| ShareError::NotFound("owner has no profile".into()))?;

    tracing::info!("[Share] Public profile served");

    Ok(Json(FetchResponse {
        key: key.to_string(),
        profile: sanitize(&raw),
    }))
}

/// PUT /me/profile — Store the caller's raw profile document.
pub async fn put_own_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let owner_id = state.identity.authenticate(&headers)?;

    if body.len() > MAX_PROFILE_BYTES {
        return Err(ShareError::Validation(format!(
            "profile is {} bytes, max {MAX_PROFILE_BYTES}",
            body.len()
        )));
    }

    let profile: Value = serde_json::from_slice(&body)
        .map_err(|e| ShareError::Validation(format!("invalid profile body: {e}")))?;
    if !profile.is_object() {
        return Err(ShareError::Validation("profile must be a JSON object".into()));
    }

    state.store.put_profile(&owner_id, profile).await?;
    tracing::info!("[Share] Owner profile stored");

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mint_request() {
        assert!(parse_mint_request(b"").unwrap().public_key.is_none());
        assert!(parse_mint_request(b"  \n").unwrap().public_key.is_none());
        assert!(parse_mint_request(b"{}").unwrap().public_key.is_none());
        assert_eq!(
            parse_mint_request(br#"{"publicKey":"HID-ABCDEFGH"}"#)
                .unwrap()
                .public_key
                .as_deref(),
            Some("HID-ABCDEFGH")
        );
        assert!(parse_mint_request(b"{not json").is_err());
    }
}
