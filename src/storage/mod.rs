//! Durable state storage.
//!
//! The leaderboard snapshot and the identity map are persisted as JSON
//! files under a data directory. The store is re-read at every recompute
//! and distribution boundary so external edits (e.g. manual tenant
//! configuration) are picked up. A failed read aborts only that read; it
//! never truncates or replaces on-disk state.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{DailyScoreEntry, IdentityRegistry, LeaderboardSnapshot, TenantConfig};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized snapshot format in {0}")]
    UnrecognizedFormat(PathBuf),
}

/// Durable key/value state for identity links and the leaderboard snapshot.
///
/// Minimal load/save surface so the backing store is swappable without
/// touching engine logic.
pub trait StateStore: Send + Sync {
    fn load_snapshot(&self) -> Result<LeaderboardSnapshot, StorageError>;
    fn save_snapshot(&self, snapshot: &LeaderboardSnapshot) -> Result<(), StorageError>;

    fn load_identities(&self) -> Result<IdentityRegistry, StorageError>;
    fn save_identities(&self, identities: &IdentityRegistry) -> Result<(), StorageError>;
}

/// Pre-multi-tenant snapshot layout: a single destination string instead
/// of the tenant map.
#[derive(Debug, Deserialize)]
struct LegacySnapshot {
    day_key: Option<NaiveDate>,
    destination: String,
    #[serde(default)]
    entries: BTreeMap<String, DailyScoreEntry>,
}

/// Tenant id assigned to the destination of a migrated legacy snapshot.
pub const LEGACY_TENANT_ID: &str = "default";

/// JSON-file-backed state store.
pub struct JsonStateStore {
    data_dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("leaderboard.json")
    }

    pub fn identities_path(&self) -> PathBuf {
        self.data_dir.join("identities.json")
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Parse a snapshot file, upgrading the legacy single-destination
    /// format to the tenant map. Upgrading is idempotent: the migrated
    /// layout has no top-level `destination` field, so a second pass
    /// parses as current and changes nothing.
    fn parse_snapshot(&self, raw: &str) -> Result<(LeaderboardSnapshot, bool), StorageError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        if !value.is_object() {
            return Err(StorageError::UnrecognizedFormat(self.snapshot_path()));
        }

        if value.get("destination").is_some() {
            let legacy: LegacySnapshot = serde_json::from_value(value)?;
            info!(
                "Migrating legacy single-destination snapshot to tenant map ({} -> tenant '{}')",
                legacy.destination, LEGACY_TENANT_ID
            );
            let mut tenants = BTreeMap::new();
            tenants.insert(
                LEGACY_TENANT_ID.to_string(),
                TenantConfig {
                    destination: legacy.destination,
                },
            );
            return Ok((
                LeaderboardSnapshot {
                    day_key: legacy.day_key,
                    tenants,
                    entries: legacy.entries,
                },
                true,
            ));
        }

        let snapshot: LeaderboardSnapshot = serde_json::from_value(value)?;
        Ok((snapshot, false))
    }
}

impl StateStore for JsonStateStore {
    fn load_snapshot(&self) -> Result<LeaderboardSnapshot, StorageError> {
        let path = self.snapshot_path();
        if !path.exists() {
            debug!("No snapshot at {:?}, starting empty", path);
            return Ok(LeaderboardSnapshot::default());
        }

        let raw = fs::read_to_string(&path)?;
        let (snapshot, migrated) = self.parse_snapshot(&raw)?;

        if migrated {
            // Persist the upgraded layout exactly once.
            self.save_snapshot(&snapshot)?;
        }

        Ok(snapshot)
    }

    fn save_snapshot(&self, snapshot: &LeaderboardSnapshot) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(self.snapshot_path(), json)?;
        debug!("Saved snapshot ({} entries)", snapshot.entries.len());
        Ok(())
    }

    fn load_identities(&self) -> Result<IdentityRegistry, StorageError> {
        let path = self.identities_path();
        if !path.exists() {
            return Ok(IdentityRegistry::new());
        }

        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(registry) => Ok(registry),
            Err(e) => {
                warn!("Unreadable identity map at {:?}: {}", path, e);
                Err(StorageError::Json(e))
            }
        }
    }

    fn save_identities(&self, identities: &IdentityRegistry) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(identities)?;
        fs::write(self.identities_path(), json)?;
        Ok(())
    }
}
