//! Key mapping and profile storage.
//!
//! Handlers never touch storage directly: they receive an
//! `Arc<dyn ProfileStore>` through the router state. The shipped
//! implementation is [`ShareStore`] (in-memory, optionally written through to
//! a data directory); tests swap in whatever they need.
//!
//! ## Layout on disk
//!
//! ```text
//! {data_dir}/keys/{publicKey}.json           KeyMapping
//! {data_dir}/profiles/{sha256(ownerId)}.json raw profile document
//! ```

pub mod share_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::share::key::PublicKey;

pub use share_store::ShareStore;

/// Public key → owner record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMapping {
    pub public_key: PublicKey,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is already mapped to someone else.
    #[error("public key {key} is owned by another account")]
    OwnerConflict { key: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage operations needed by the share endpoints.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create or refresh the mapping for `key`.
    ///
    /// Keeps `created_at` of an existing record and always refreshes
    /// `updated_at`. Fails with [`StoreError::OwnerConflict`] if the key
    /// belongs to a different owner.
    async fn upsert_mapping(&self, key: &PublicKey, owner_id: &str)
        -> Result<KeyMapping, StoreError>;

    /// Point lookup of the owner of `key`.
    async fn lookup_owner(&self, key: &PublicKey) -> Result<Option<String>, StoreError>;

    /// Load the raw profile document of `owner_id`.
    async fn get_profile(&self, owner_id: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the raw profile document of `owner_id`.
    async fn put_profile(&self, owner_id: &str, profile: Value) -> Result<(), StoreError>;
}
