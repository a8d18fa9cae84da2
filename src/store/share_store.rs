//! In-memory share store with optional write-through to disk.
//!
//! Mappings and profiles live in DashMaps for lock-free concurrent access.
//! When a data directory is configured every change is written as its own JSON
//! file (temp file + rename) and everything is reloaded at startup. Unlike
//! best-effort caches, a failed write is reported to the caller and the
//! in-memory change is rolled back, so a request never half-succeeds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{KeyMapping, ProfileStore, StoreError};
use crate::share::key::PublicKey;

/// On-disk profile record. The owner id is kept alongside the document because
/// the file name is only a hash of it.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedProfile {
    owner_id: String,
    profile: Value,
}

#[derive(Clone)]
pub struct ShareStore {
    /// Public key → mapping.
    mappings: Arc<DashMap<String, KeyMapping>>,
    /// Owner id → raw profile document.
    profiles: Arc<DashMap<String, Value>>,
    /// Directory for persistence. None = in-memory only.
    data_dir: Option<PathBuf>,
}

impl ShareStore {
    /// Create a store. With `data_dir` set, changes are persisted under it.
    pub fn new(data_dir: Option<&str>) -> Self {
        Self {
            mappings: Arc::new(DashMap::new()),
            profiles: Arc::new(DashMap::new()),
            data_dir: data_dir.map(PathBuf::from),
        }
    }

    fn keys_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join("keys"))
    }

    fn profiles_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join("profiles"))
    }

    /// Load all mappings and profiles from disk.
    ///
    /// Called once at startup. Unreadable or corrupt files are logged and
    /// skipped. Returns `(mappings, profiles)` loaded.
    pub fn load_from_disk(&self) -> (usize, usize) {
        let (Some(keys_dir), Some(profiles_dir)) = (self.keys_dir(), self.profiles_dir()) else {
            tracing::info!("[Store] No data_dir configured, running in-memory only");
            return (0, 0);
        };

        let mut mappings = 0;
        for mapping in read_json_dir::<KeyMapping>(&keys_dir) {
            self.mappings
                .insert(mapping.public_key.as_str().to_string(), mapping);
            mappings += 1;
        }

        let mut profiles = 0;
        for record in read_json_dir::<PersistedProfile>(&profiles_dir) {
            self.profiles.insert(record.owner_id, record.profile);
            profiles += 1;
        }

        tracing::info!(
            mappings = mappings,
            profiles = profiles,
            "[Store] Share data loaded from disk"
        );
        (mappings, profiles)
    }

    fn persist_mapping(&self, mapping: &KeyMapping) -> Result<(), StoreError> {
        match self.keys_dir() {
            Some(dir) => write_json_atomic(
                &dir.join(format!("{}.json", mapping.public_key)),
                mapping,
            ),
            None => Ok(()),
        }
    }

    fn persist_profile(&self, record: &PersistedProfile) -> Result<(), StoreError> {
        match self.profiles_dir() {
            Some(dir) => write_json_atomic(
                &dir.join(format!("{}.json", owner_file_stem(&record.owner_id))),
                record,
            ),
            None => Ok(()),
        }
    }

    /// Number of key mappings held.
    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    /// Number of profiles held.
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }
}

#[async_trait]
impl ProfileStore for ShareStore {
    async fn upsert_mapping(
        &self,
        key: &PublicKey,
        owner_id: &str,
    ) -> Result<KeyMapping, StoreError> {
        let now = Utc::now();

        // The entry guard is dropped at the end of the match, before any I/O.
        let (mapping, previous) = match self.mappings.entry(key.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().owner_id != owner_id {
                    return Err(StoreError::OwnerConflict {
                        key: key.to_string(),
                    });
                }
                let previous = entry.get().clone();
                entry.get_mut().updated_at = now;
                (entry.get().clone(), Some(previous))
            }
            Entry::Vacant(entry) => {
                let mapping = KeyMapping {
                    public_key: key.clone(),
                    owner_id: owner_id.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                entry.insert(mapping.clone());
                (mapping, None)
            }
        };

        if let Err(e) = self.persist_mapping(&mapping) {
            tracing::error!(error = %e, "[Store] Failed to persist key mapping, rolling back");
            match previous {
                Some(previous) => {
                    self.mappings.insert(key.as_str().to_string(), previous);
                }
                None => {
                    self.mappings.remove(key.as_str());
                }
            }
            return Err(e);
        }

        tracing::debug!(
            created = previous.is_none(),
            "[Store] Key mapping upserted"
        );
        Ok(mapping)
    }

    async fn lookup_owner(&self, key: &PublicKey) -> Result<Option<String>, StoreError> {
        Ok(self
            .mappings
            .get(key.as_str())
            .map(|m| m.owner_id.clone()))
    }

    async fn get_profile(&self, owner_id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.profiles.get(owner_id).map(|p| p.clone()))
    }

    async fn put_profile(&self, owner_id: &str, profile: Value) -> Result<(), StoreError> {
        let record = PersistedProfile {
            owner_id: owner_id.to_string(),
            profile,
        };
        self.persist_profile(&record)?;
        self.profiles.insert(record.owner_id, record.profile);
        Ok(())
    }
}

/// File stem for an owner's profile: owner ids are not path-safe.
fn owner_file_stem(owner_id: &str) -> String {
    hex::encode(Sha256::digest(owner_id.as_bytes()))
}

/// Write `value` as pretty JSON to `path` via a uniquely named temp file.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

    std::fs::write(&tmp_path, &json)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Read every `*.json` file in `dir`, skipping anything that fails to parse.
fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> Vec<T> {
    if !dir.exists() {
        tracing::info!(path = %dir.display(), "[Store] Directory missing, starting fresh");
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, path = %dir.display(), "[Store] Failed to read directory");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        // Leftover temp files end in `.tmp`
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<T>(&contents) {
                Ok(value) => out.push(value),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "[Store] Failed to parse record, skipping"
                    );
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "[Store] Failed to read record");
            }
        }
    }
    out
}
