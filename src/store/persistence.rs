//! Persistence layer for the Version Store

use crate::error::StorageError;
use crate::graph::{Branch, Version};
use crate::store::{GraphPointers, VersionStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const VERSIONS_TREE: &str = "versions";
const BRANCHES_TREE: &str = "branches";
const STATE_TREE: &str = "state";
const POINTERS_KEY: &[u8] = b"pointers";

/// Sled-based implementation of VersionStore
///
/// Each record kind lives in its own sled tree, keyed by version id or
/// branch name, with bincode-encoded values.
pub struct SledVersionStore {
    db: sled::Db,
    versions: sled::Tree,
    branches: sled::Tree,
    state: sled::Tree,
}

impl SledVersionStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref())
            .map_err(|e| StorageError::Database(format!("Failed to open sled database: {}", e)))?;
        let versions = db.open_tree(VERSIONS_TREE)?;
        let branches = db.open_tree(BRANCHES_TREE)?;
        let state = db.open_tree(STATE_TREE)?;
        Ok(Self {
            db,
            versions,
            branches,
            state,
        })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Check if a version record exists
    pub fn contains_version(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.versions.contains_key(id.as_bytes())?)
    }
}

fn get_record<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> Result<Option<T>, StorageError> {
    match tree.get(key.as_bytes())? {
        Some(value) => Ok(Some(bincode::deserialize(&value)?)),
        None => Ok(None),
    }
}

fn put_record<T: Serialize>(tree: &sled::Tree, key: &str, record: &T) -> Result<(), StorageError> {
    let value = bincode::serialize(record)?;
    tree.insert(key.as_bytes(), value)?;
    Ok(())
}

fn list_records<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, StorageError> {
    let mut records = Vec::new();
    for item in tree.iter() {
        let (_, value) = item?;
        records.push(bincode::deserialize(&value)?);
    }
    Ok(records)
}

impl VersionStore for SledVersionStore {
    fn get_version(&self, id: &str) -> Result<Option<Version>, StorageError> {
        get_record(&self.versions, id)
    }

    fn put_version(&self, version: &Version) -> Result<(), StorageError> {
        put_record(&self.versions, &version.id, version)
    }

    fn list_versions(&self) -> Result<Vec<Version>, StorageError> {
        list_records(&self.versions)
    }

    fn get_branch(&self, name: &str) -> Result<Option<Branch>, StorageError> {
        get_record(&self.branches, name)
    }

    fn put_branch(&self, branch: &Branch) -> Result<(), StorageError> {
        put_record(&self.branches, &branch.name, branch)
    }

    fn delete_branch(&self, name: &str) -> Result<(), StorageError> {
        self.branches.remove(name.as_bytes())?;
        Ok(())
    }

    fn list_branches(&self) -> Result<Vec<Branch>, StorageError> {
        list_records(&self.branches)
    }

    fn load_pointers(&self) -> Result<Option<GraphPointers>, StorageError> {
        match self.state.get(POINTERS_KEY)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn save_pointers(&self, pointers: &GraphPointers) -> Result<(), StorageError> {
        let value = bincode::serialize(pointers)?;
        self.state.insert(POINTERS_KEY, value)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
