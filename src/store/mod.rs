//! Version Store
//!
//! Durable storage for version records, branch pointers and the
//! checked-out position, plus content files for image payloads.

pub mod payload;
pub mod persistence;

pub use payload::ImageStore;
pub use persistence::SledVersionStore;

use crate::error::StorageError;
use crate::graph::{Branch, Version};
use crate::types::{BranchName, VersionId};
use serde::{Deserialize, Serialize};

/// Checked-out branch and version, persisted alongside the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPointers {
    pub current_branch: BranchName,
    pub current_version: Option<VersionId>,
}

/// Version store interface
pub trait VersionStore: Send + Sync {
    fn get_version(&self, id: &str) -> Result<Option<Version>, StorageError>;
    fn put_version(&self, version: &Version) -> Result<(), StorageError>;
    fn list_versions(&self) -> Result<Vec<Version>, StorageError>;

    fn get_branch(&self, name: &str) -> Result<Option<Branch>, StorageError>;
    fn put_branch(&self, branch: &Branch) -> Result<(), StorageError>;
    fn delete_branch(&self, name: &str) -> Result<(), StorageError>;
    fn list_branches(&self) -> Result<Vec<Branch>, StorageError>;

    fn load_pointers(&self) -> Result<Option<GraphPointers>, StorageError>;
    fn save_pointers(&self, pointers: &GraphPointers) -> Result<(), StorageError>;

    /// Block until all pending writes are on disk.
    fn flush(&self) -> Result<(), StorageError>;
}
