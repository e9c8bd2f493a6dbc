//! Version and branch records

use crate::commitment::OddNodePolicy;
use crate::region::RegionParams;
use crate::types::{BranchName, Hash, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key material needed to decrypt a stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionInfo {
    pub key: String,
    pub iv: String,
}

/// Settings a version's root hash was computed with.
///
/// Two root hashes are only comparable when these match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintParams {
    pub max_depth: u32,
    pub min_size: u32,
    pub threshold: f64,
    pub odd_node: OddNodePolicy,
}

impl FingerprintParams {
    pub fn new(region: &RegionParams, odd_node: OddNodePolicy) -> Self {
        Self {
            max_depth: region.max_depth,
            min_size: region.min_size,
            threshold: region.threshold,
            odd_node,
        }
    }

    /// Region parameters for a rebuild, with the caller's parallel cutoff.
    pub fn region_params(&self, parallel_depth: u32) -> RegionParams {
        RegionParams::new(self.max_depth, self.min_size, self.threshold).with_parallel_depth(parallel_depth)
    }

    /// Stable textual form, used in cache keys.
    pub fn cache_fragment(&self) -> String {
        format!("{}_{:?}", self.region_params(0).cache_fragment(), self.odd_node)
    }
}

/// Immutable snapshot of one image state.
///
/// `id` is random and independent of content; `root_hash` is the content
/// fingerprint. Ancestry is resolved by id lookup, never by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub parent_id: Option<VersionId>,
    pub merge_source_id: Option<VersionId>,
    pub branch: BranchName,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub root_hash: Hash,
    pub width: u32,
    pub height: u32,
    pub leaf_count: usize,
    pub params: FingerprintParams,
    pub encryption: Option<EncryptionInfo>,
    pub signature: Option<Vec<u8>>,
}

impl Version {
    pub fn is_merge_commit(&self) -> bool {
        self.merge_source_id.is_some()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Bytes covered by the version signature: id, parent id, message,
    /// timestamp, root hash and branch, concatenated without separators.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = String::new();
        payload.push_str(&self.id);
        payload.push_str(self.parent_id.as_deref().unwrap_or(""));
        payload.push_str(&self.message);
        payload.push_str(&self.timestamp.timestamp_millis().to_string());
        payload.push_str(&self.root_hash);
        payload.push_str(&self.branch);
        payload.into_bytes()
    }
}

/// Named, movable pointer into the version graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: BranchName,
    pub head: Option<VersionId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(name: impl Into<BranchName>, head: Option<VersionId>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}
