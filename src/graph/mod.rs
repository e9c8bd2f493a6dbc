//! Version Graph
//!
//! The version-control state machine. Versions form a DAG through
//! `parent_id` and `merge_source_id`; branches are named pointers into it.
//! Every mutation is written through to the [`VersionStore`], and a branch
//! head only moves after the version it points to has been flushed.

pub mod record;

pub use record::{Branch, EncryptionInfo, FingerprintParams, Version};

use crate::commitment::{CommitmentTree, OddNodePolicy};
use crate::error::{RegionError, RepoError, SecurityError, StorageError};
use crate::merge::{three_way_merge, MergeConfig};
use crate::raster::Raster;
use crate::region::{RegionParams, RegionTree};
use crate::security::SecurityProvider;
use crate::store::{GraphPointers, ImageStore, VersionStore};
use crate::types::{BranchName, VersionId, MAIN_BRANCH};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const MAIN_BRANCH_DESCRIPTION: &str = "Main branch";

/// Parameters that shape how images are fingerprinted and merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSettings {
    pub region: RegionParams,
    pub odd_node: OddNodePolicy,
    pub merge: MergeConfig,
}

impl GraphSettings {
    /// Parameters new versions are fingerprinted with.
    pub fn fingerprint_params(&self) -> FingerprintParams {
        FingerprintParams::new(&self.region, self.odd_node)
    }
}

/// Options for [`VersionGraph::commit`].
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Target branch; the current branch when `None`.
    pub branch: Option<BranchName>,
    pub encrypt: bool,
    pub sign: bool,
}

impl CommitOptions {
    pub fn on_branch(branch: impl Into<BranchName>) -> Self {
        Self {
            branch: Some(branch.into()),
            ..Self::default()
        }
    }
}

/// What a merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResult {
    /// The other branch brings nothing new; the head is unchanged.
    UpToDate(Option<VersionId>),
    /// The current branch head moved to the other branch's head.
    FastForward(VersionId),
    /// A merge version was created.
    Merged { version: VersionId, conflicts: usize },
}

impl MergeResult {
    /// Head of the current branch after the merge.
    pub fn head(&self) -> Option<&str> {
        match self {
            MergeResult::UpToDate(head) => head.as_deref(),
            MergeResult::FastForward(head) => Some(head),
            MergeResult::Merged { version, .. } => Some(version),
        }
    }
}

/// Fingerprint of one image: its region tree and the commitment over its leaves.
pub struct Fingerprint {
    pub regions: RegionTree,
    pub commitment: CommitmentTree,
}

impl Fingerprint {
    pub fn root_hash(&self) -> &str {
        self.commitment.root_hash()
    }
}

struct NewVersion<'a> {
    image: &'a Raster,
    message: String,
    branch: BranchName,
    parent_id: Option<VersionId>,
    merge_source_id: Option<VersionId>,
    encrypt: bool,
    sign: bool,
}

pub struct VersionGraph {
    store: Box<dyn VersionStore>,
    images: ImageStore,
    security: Option<Arc<dyn SecurityProvider>>,
    settings: GraphSettings,
    versions: HashMap<VersionId, Version>,
    branches: HashMap<BranchName, Branch>,
    current_branch: BranchName,
    current_version: Option<VersionId>,
    staged: Option<Raster>,
}

impl VersionGraph {
    /// Load the graph from its stores, creating the `main` branch on first use.
    pub fn open(
        store: Box<dyn VersionStore>,
        images: ImageStore,
        security: Option<Arc<dyn SecurityProvider>>,
        settings: GraphSettings,
    ) -> Result<Self, RepoError> {
        settings.region.validate()?;

        let versions: HashMap<VersionId, Version> = store
            .list_versions()?
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();
        let mut branches: HashMap<BranchName, Branch> = store
            .list_branches()?
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();

        if !branches.contains_key(MAIN_BRANCH) {
            let main = Branch::new(MAIN_BRANCH, None, MAIN_BRANCH_DESCRIPTION);
            store.put_branch(&main)?;
            branches.insert(main.name.clone(), main);
        }
        if let Some(missing) = branches
            .values()
            .filter_map(|b| b.head.as_ref())
            .find(|head| !versions.contains_key(*head))
        {
            return Err(StorageError::VersionNotFound(missing.clone()).into());
        }

        let pointers = match store.load_pointers()? {
            Some(pointers) if branches.contains_key(&pointers.current_branch) => pointers,
            Some(pointers) => {
                warn!(branch = %pointers.current_branch, "Checked-out branch missing, falling back to main");
                GraphPointers {
                    current_branch: MAIN_BRANCH.to_string(),
                    current_version: branches.get(MAIN_BRANCH).and_then(|b| b.head.clone()),
                }
            }
            None => GraphPointers {
                current_branch: MAIN_BRANCH.to_string(),
                current_version: branches.get(MAIN_BRANCH).and_then(|b| b.head.clone()),
            },
        };
        store.save_pointers(&pointers)?;
        store.flush()?;

        let staged = match images.read_staged()? {
            Some(bytes) => Some(Raster::decode(&bytes)?),
            None => None,
        };

        debug!(
            versions = versions.len(),
            branches = branches.len(),
            current_branch = %pointers.current_branch,
            "Opened version graph"
        );

        Ok(Self {
            store,
            images,
            security,
            settings,
            versions,
            branches,
            current_branch: pointers.current_branch,
            current_version: pointers.current_version,
            staged,
        })
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Decompose an image and commit to its leaves with this graph's settings.
    pub fn fingerprint(&self, image: &Raster) -> Result<Fingerprint, RegionError> {
        self.fingerprint_with(image, &self.settings.fingerprint_params())
    }

    /// Fingerprint `image` the way a version recorded with `params` was.
    pub fn fingerprint_with(&self, image: &Raster, params: &FingerprintParams) -> Result<Fingerprint, RegionError> {
        let regions = RegionTree::build(image, &params.region_params(self.settings.region.parallel_depth))?;
        let commitment = CommitmentTree::from_region_tree(&regions, params.odd_node);
        Ok(Fingerprint {
            regions,
            commitment,
        })
    }

    /// Whether `image` differs from the current version.
    ///
    /// Always true when nothing has been committed on the current branch.
    pub fn has_changes(&self, image: &Raster) -> Result<bool, RepoError> {
        let Some(current) = self.current_version.as_deref().and_then(|id| self.versions.get(id)) else {
            return Ok(true);
        };
        let fingerprint = self.fingerprint_with(image, &current.params)?;
        Ok(fingerprint.root_hash() != current.root_hash)
    }

    /// Place an image in the staging slot, replacing any previous one.
    pub fn stage(&mut self, image: Raster) -> Result<(), RepoError> {
        if image.is_empty() {
            return Err(RegionError::EmptyImage {
                width: image.width(),
                height: image.height(),
            }
            .into());
        }
        self.images.write_staged(&image.encode_png()?)?;
        debug!(width = image.width(), height = image.height(), "Staged image");
        self.staged = Some(image);
        Ok(())
    }

    pub fn staged(&self) -> Option<&Raster> {
        self.staged.as_ref()
    }

    pub fn clear_staged(&mut self) -> Result<(), RepoError> {
        self.images.clear_staged()?;
        self.staged = None;
        Ok(())
    }

    /// Turn the staged image into a new version on the target branch.
    #[instrument(skip(self, options), fields(branch = ?options.branch))]
    pub fn commit(&mut self, message: &str, options: &CommitOptions) -> Result<VersionId, RepoError> {
        let staged = self.staged.clone().ok_or(RepoError::NothingStaged)?;
        let branch = options
            .branch
            .clone()
            .unwrap_or_else(|| self.current_branch.clone());
        let parent_id = self.branch_head(&branch)?;

        let id = self.record_version(NewVersion {
            image: &staged,
            message: message.to_string(),
            branch,
            parent_id,
            merge_source_id: None,
            encrypt: options.encrypt,
            sign: options.sign,
        })?;

        self.staged = None;
        if let Err(e) = self.images.clear_staged() {
            warn!(version = %id, error = %e, "Committed but failed to remove staged file");
        }
        Ok(id)
    }

    /// Repoint a branch head at an existing version. No version is created.
    #[instrument(skip(self))]
    pub fn rollback_to_version(&mut self, version_id: &str, branch: Option<&str>) -> Result<(), RepoError> {
        if !self.versions.contains_key(version_id) {
            return Err(RepoError::UnknownVersion(version_id.to_string()));
        }
        let branch = branch.unwrap_or(&self.current_branch).to_string();
        if !self.branches.contains_key(&branch) {
            return Err(RepoError::UnknownBranch(branch));
        }

        self.move_head(&branch, Some(version_id.to_string()))?;
        info!(version = %version_id, branch = %branch, "Rolled back branch");
        Ok(())
    }

    fn branch_head(&self, branch: &str) -> Result<Option<VersionId>, RepoError> {
        self.branches
            .get(branch)
            .map(|b| b.head.clone())
            .ok_or_else(|| RepoError::UnknownBranch(branch.to_string()))
    }

    fn security(&self) -> Result<&Arc<dyn SecurityProvider>, SecurityError> {
        self.security.as_ref().ok_or(SecurityError::Unavailable)
    }

    /// Persist a new version, then advance its branch.
    fn record_version(&mut self, new: NewVersion<'_>) -> Result<VersionId, RepoError> {
        if !self.branches.contains_key(&new.branch) {
            return Err(RepoError::UnknownBranch(new.branch));
        }
        if new.encrypt || new.sign {
            self.security()?;
        }

        let fingerprint = self.fingerprint(new.image)?;
        let id = Uuid::new_v4().simple().to_string();

        let mut payload = new.image.encode_png()?;
        let encryption = if new.encrypt {
            let security = self.security()?;
            let info = EncryptionInfo {
                key: security.generate_key(),
                iv: security.generate_iv(),
            };
            payload = security.encrypt(&payload, &info.key, &info.iv)?;
            Some(info)
        } else {
            None
        };
        self.images.write_payload(&id, &payload, encryption.is_some())?;

        let mut version = Version {
            id: id.clone(),
            parent_id: new.parent_id,
            merge_source_id: new.merge_source_id,
            branch: new.branch,
            message: new.message,
            timestamp: Utc::now(),
            root_hash: fingerprint.root_hash().to_string(),
            width: new.image.width(),
            height: new.image.height(),
            leaf_count: fingerprint.commitment.leaf_count(),
            params: self.settings.fingerprint_params(),
            encryption,
            signature: None,
        };
        if new.sign {
            version.signature = Some(self.security()?.sign(&version.signing_payload())?);
        }

        self.store.put_version(&version)?;
        self.store.flush()?;

        let branch = version.branch.clone();
        info!(
            version = %id,
            branch = %branch,
            root_hash = %version.root_hash,
            leaves = version.leaf_count,
            merge = version.is_merge_commit(),
            "Committed version"
        );
        self.versions.insert(id.clone(), version);
        self.move_head(&branch, Some(id.clone()))?;
        Ok(id)
    }

    /// Point `branch` at `head`, following with the current version when
    /// `branch` is checked out.
    fn move_head(&mut self, branch: &str, head: Option<VersionId>) -> Result<(), RepoError> {
        let record = self
            .branches
            .get_mut(branch)
            .ok_or_else(|| RepoError::UnknownBranch(branch.to_string()))?;
        record.head = head.clone();
        self.store.put_branch(record)?;

        if branch == self.current_branch {
            self.current_version = head;
            self.save_pointers()?;
        }
        self.store.flush()?;
        Ok(())
    }

    fn save_pointers(&self) -> Result<(), StorageError> {
        self.store.save_pointers(&GraphPointers {
            current_branch: self.current_branch.clone(),
            current_version: self.current_version.clone(),
        })
    }

    /// Nearest version reachable from both `a` and `b` through first parents.
    pub fn find_common_ancestor(&self, a: &str, b: &str) -> Option<VersionId> {
        if !self.versions.contains_key(a) || !self.versions.contains_key(b) {
            return None;
        }
        let from_a: HashSet<&str> = self.first_parent_chain(a).collect();
        self.first_parent_chain(b)
            .find(|id| from_a.contains(id))
            .map(str::to_string)
    }

    /// `start` followed by its first-parent ancestors.
    fn first_parent_chain<'a>(&'a self, start: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut seen = HashSet::new();
        std::iter::successors(Some(start), move |id| {
            self.versions
                .get(*id)
                .and_then(|v| v.parent_id.as_deref())
        })
        .take_while(move |id| seen.insert(*id) && self.versions.contains_key(*id))
    }

    /// Versions from `start` (default: the current version) back to the root.
    pub fn history(&self, start: Option<&str>) -> Result<Vec<&Version>, RepoError> {
        let start = match start {
            Some(id) if !self.versions.contains_key(id) => {
                return Err(RepoError::UnknownVersion(id.to_string()))
            }
            Some(id) => id,
            None => match self.current_version.as_deref() {
                Some(id) => id,
                None => return Ok(Vec::new()),
            },
        };
        Ok(self
            .first_parent_chain(start)
            .filter_map(|id| self.versions.get(id))
            .collect())
    }

    /// Merge `branch` into the current branch.
    ///
    /// An empty `message` becomes "Merge branch '<branch>' into <current>".
    #[instrument(skip(self, message))]
    pub fn merge_branch(&mut self, branch: &str, message: &str) -> Result<MergeResult, RepoError> {
        let theirs = self.branch_head(branch)?;
        let ours = self.current_version.clone();

        let theirs = match theirs {
            Some(theirs) if ours.as_deref() != Some(theirs.as_str()) => theirs,
            _ => {
                debug!(branch = %branch, "Nothing to merge");
                return Ok(MergeResult::UpToDate(ours));
            }
        };
        let Some(ours) = ours else {
            let current = self.current_branch.clone();
            self.move_head(&current, Some(theirs.clone()))?;
            info!(branch = %branch, head = %theirs, "Fast-forwarded empty branch");
            return Ok(MergeResult::FastForward(theirs));
        };

        let base = self
            .find_common_ancestor(&ours, &theirs)
            .ok_or_else(|| RepoError::NoCommonAncestor(ours.clone(), theirs.clone()))?;

        if base == theirs {
            debug!(branch = %branch, "Branch already merged");
            return Ok(MergeResult::UpToDate(Some(ours)));
        }
        if base == ours {
            let current = self.current_branch.clone();
            self.move_head(&current, Some(theirs.clone()))?;
            info!(branch = %branch, head = %theirs, "Fast-forward merge");
            return Ok(MergeResult::FastForward(theirs));
        }

        let outcome = three_way_merge(
            &self.load_image(&base)?,
            &self.load_image(&ours)?,
            &self.load_image(&theirs)?,
            &self.settings.merge,
        )?;
        if outcome.has_conflicts() {
            warn!(branch = %branch, conflicts = outcome.conflicts, "Merge produced conflicts");
        }

        let message = if message.is_empty() {
            format!("Merge branch '{}' into {}", branch, self.current_branch)
        } else {
            message.to_string()
        };
        let version = self.record_version(NewVersion {
            image: &outcome.image,
            message,
            branch: self.current_branch.clone(),
            parent_id: Some(ours),
            merge_source_id: Some(theirs),
            encrypt: false,
            sign: false,
        })?;

        Ok(MergeResult::Merged {
            version,
            conflicts: outcome.conflicts,
        })
    }

    /// Create a branch at `start_point`, or at the current version if `None`.
    pub fn create_branch(
        &mut self,
        name: &str,
        start_point: Option<&str>,
        description: &str,
    ) -> Result<(), RepoError> {
        if self.branches.contains_key(name) {
            return Err(RepoError::BranchExists(name.to_string()));
        }
        let head = match start_point {
            Some(id) if !self.versions.contains_key(id) => {
                return Err(RepoError::UnknownVersion(id.to_string()))
            }
            Some(id) => Some(id.to_string()),
            None => self.current_version.clone(),
        };

        let branch = Branch::new(name, head, description);
        self.store.put_branch(&branch)?;
        self.store.flush()?;
        info!(branch = %name, head = ?branch.head, "Created branch");
        self.branches.insert(name.to_string(), branch);
        Ok(())
    }

    pub fn switch_branch(&mut self, name: &str) -> Result<(), RepoError> {
        let head = self.branch_head(name)?;
        self.current_branch = name.to_string();
        self.current_version = head;
        self.save_pointers()?;
        self.store.flush()?;
        info!(branch = %name, "Switched branch");
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str) -> Result<(), RepoError> {
        if !self.branches.contains_key(name) {
            return Err(RepoError::UnknownBranch(name.to_string()));
        }
        if name == self.current_branch {
            return Err(RepoError::CannotDeleteCurrentBranch(name.to_string()));
        }
        if name == MAIN_BRANCH {
            return Err(RepoError::CannotDeletePermanentBranch(name.to_string()));
        }

        self.store.delete_branch(name)?;
        self.store.flush()?;
        self.branches.remove(name);
        info!(branch = %name, "Deleted branch");
        Ok(())
    }

    pub fn version(&self, id: &str) -> Option<&Version> {
        self.versions.get(id)
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self.versions.values().collect();
        versions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        versions
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// All branches, sorted by name.
    pub fn branches(&self) -> Vec<&Branch> {
        let mut branches: Vec<&Branch> = self.branches.values().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    pub fn current_branch(&self) -> &str {
        &self.current_branch
    }

    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    /// Load a version's image, decrypting it when needed.
    pub fn load_image(&self, version_id: &str) -> Result<Raster, RepoError> {
        let version = self
            .versions
            .get(version_id)
            .ok_or_else(|| RepoError::UnknownVersion(version_id.to_string()))?;

        let payload = match self.images.read_payload(version_id, version.is_encrypted()) {
            Ok(payload) => payload,
            Err(StorageError::PayloadNotFound(_)) => {
                return Err(RepoError::ImageUnavailable(version_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = match &version.encryption {
            Some(info) => {
                let security = self
                    .security
                    .as_ref()
                    .ok_or_else(|| RepoError::ImageUnavailable(version_id.to_string()))?;
                security.decrypt(&payload, &info.key, &info.iv).map_err(|e| {
                    warn!(version = %version_id, error = %e, "Failed to decrypt payload");
                    RepoError::ImageUnavailable(version_id.to_string())
                })?
            }
            None => payload,
        };

        Ok(Raster::decode(&bytes)?)
    }

    /// Check a version's signature. Unsigned versions verify as `false`.
    pub fn verify_signature(&self, version_id: &str) -> Result<bool, RepoError> {
        let version = self
            .versions
            .get(version_id)
            .ok_or_else(|| RepoError::UnknownVersion(version_id.to_string()))?;
        let Some(signature) = &version.signature else {
            return Ok(false);
        };
        Ok(self.security()?.verify(&version.signing_payload(), signature))
    }
}
