//! Sled-backed persistence for customization settings.
//!
//! Two trees under one database directory:
//!
//! ```text
//! settings/
//! ├── customization   ← the committed hammer selection
//! └── entitlements    ← cached owned product ids
//! ```
//!
//! Records carry a schema version so a future layout change fails loudly
//! instead of decoding garbage. The selection stores palette positions, not
//! colors; whether a stored position is still meaningful is the caller's
//! problem, which keeps this layer free of catalog knowledge.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sled::IVec;
use thiserror::Error;

pub const SELECTION_SCHEMA_VERSION: u8 = 1;
pub const ENTITLEMENT_SCHEMA_VERSION: u8 = 1;

const TREE_CUSTOMIZATION: &str = "customization";
const TREE_ENTITLEMENTS: &str = "entitlements";
const KEY_SELECTION: &[u8] = b"selection";
const KEY_OWNED: &[u8] = b"owned";

/// Errors that can arise while reading or writing the settings database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {record}: expected {expected}, got {found}")]
    SchemaMismatch {
        record: &'static str,
        expected: u8,
        found: u8,
    },
}

/// The committed head and handle palette positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub schema_version: u8,
    pub head: u64,
    pub handle: u64,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntitlementRecord {
    schema_version: u8,
    product_ids: Vec<String>,
    updated_at: DateTime<Utc>,
}

/// Sled-backed store for the saved selection and the entitlement cache.
///
/// Clones share the same underlying database, so one open per path is the
/// rule; sled enforces it with a file lock.
#[derive(Clone)]
pub struct SettingsStore {
    _db: sled::Db,
    customization: sled::Tree,
    entitlements: sled::Tree,
}

impl SettingsStore {
    /// Open (or create) the settings database rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let customization = db.open_tree(TREE_CUSTOMIZATION)?;
        let entitlements = db.open_tree(TREE_ENTITLEMENTS)?;
        Ok(Self {
            _db: db,
            customization,
            entitlements,
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StorageError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Fetch the committed selection, or `None` on a fresh install.
    pub fn load_selection(&self) -> Result<Option<SelectionRecord>, StorageError> {
        let Some(bytes) = self.customization.get(KEY_SELECTION)? else {
            return Ok(None);
        };
        let record: SelectionRecord = Self::deserialize(bytes)?;
        if record.schema_version != SELECTION_SCHEMA_VERSION {
            return Err(StorageError::SchemaMismatch {
                record: "selection",
                expected: SELECTION_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    /// Persist the committed selection.
    pub fn save_selection(&self, head: usize, handle: usize) -> Result<(), StorageError> {
        let record = SelectionRecord {
            schema_version: SELECTION_SCHEMA_VERSION,
            head: head as u64,
            handle: handle as u64,
            saved_at: Utc::now(),
        };
        let bytes = Self::serialize(&record)?;
        self.customization.insert(KEY_SELECTION, bytes)?;
        self.customization.flush()?;
        debug!("saved selection head={head} handle={handle}");
        Ok(())
    }

    /// Fetch the cached entitlements, or `None` when nothing was cached yet.
    pub fn load_entitlements(&self) -> Result<Option<HashSet<String>>, StorageError> {
        let Some(bytes) = self.entitlements.get(KEY_OWNED)? else {
            return Ok(None);
        };
        let record: EntitlementRecord = Self::deserialize(bytes)?;
        if record.schema_version != ENTITLEMENT_SCHEMA_VERSION {
            return Err(StorageError::SchemaMismatch {
                record: "entitlements",
                expected: ENTITLEMENT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record.product_ids.into_iter().collect()))
    }

    /// Persist the entitlement cache.
    pub fn save_entitlements(&self, owned: &HashSet<String>) -> Result<(), StorageError> {
        let mut product_ids: Vec<String> = owned.iter().cloned().collect();
        product_ids.sort();
        let record = EntitlementRecord {
            schema_version: ENTITLEMENT_SCHEMA_VERSION,
            product_ids,
            updated_at: Utc::now(),
        };
        let bytes = Self::serialize(&record)?;
        self.entitlements.insert(KEY_OWNED, bytes)?;
        self.entitlements.flush()?;
        debug!("cached {} entitlements", owned.len());
        Ok(())
    }

    /// Flush both trees to disk. Writes already flush on their own; this is
    /// for an orderly shutdown.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.customization.flush()?;
        self.entitlements.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("settings")).unwrap()
    }

    #[test]
    fn fresh_store_has_nothing_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.load_selection().unwrap().is_none());
        assert!(store.load_entitlements().unwrap().is_none());
    }

    #[test]
    fn selection_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.save_selection(13, 2).unwrap();
        let record = store.load_selection().unwrap().unwrap();
        assert_eq!(record.head, 13);
        assert_eq!(record.handle, 2);
        assert_eq!(record.schema_version, SELECTION_SCHEMA_VERSION);
    }

    #[test]
    fn entitlements_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let owned: HashSet<String> = ["ht1", "hw1"].iter().map(|s| s.to_string()).collect();
        store.save_entitlements(&owned).unwrap();
        assert_eq!(store.load_entitlements().unwrap().unwrap(), owned);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(&dir);
            store.save_selection(4, 0).unwrap();
        }
        let store = open_store(&dir);
        let record = store.load_selection().unwrap().unwrap();
        assert_eq!((record.head, record.handle), (4, 0));
    }

    #[test]
    fn last_save_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.save_selection(1, 1).unwrap();
        store.save_selection(7, 0).unwrap();
        let record = store.load_selection().unwrap().unwrap();
        assert_eq!((record.head, record.handle), (7, 0));
    }

    #[test]
    fn unexpected_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings");
        {
            let db = sled::open(&path).unwrap();
            let tree = db.open_tree(TREE_CUSTOMIZATION).unwrap();
            let record = SelectionRecord {
                schema_version: 99,
                head: 0,
                handle: 1,
                saved_at: Utc::now(),
            };
            tree.insert(KEY_SELECTION, bincode::serialize(&record).unwrap())
                .unwrap();
            tree.flush().unwrap();
        }
        let store = SettingsStore::open(&path).unwrap();
        let err = store.load_selection().unwrap_err();
        assert!(matches!(
            err,
            StorageError::SchemaMismatch {
                record: "selection",
                expected: SELECTION_SCHEMA_VERSION,
                found: 99,
            }
        ));
    }
}
