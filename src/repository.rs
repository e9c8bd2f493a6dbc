//! Repository facade
//!
//! Ties the version graph to an on-disk layout under `<root>/.tessera/`:
//!
//! ```text
//! .tessera/
//!   config.toml
//!   db/                      sled: versions, branches, state
//!   objects/<id[0..2]>/      version payloads (.png or .png.enc)
//!   staging/staged.png
//!   keys/signing.key
//! ```
//!
//! Comparison and visualization results are memoized in bounded caches.

use crate::cache::{cache_key, ResultCache};
use crate::commitment::{CommitmentTree, InclusionProof};
use crate::config::{repository_config_path, ConfigLoader, TesseraConfig};
use crate::error::{CommitmentError, RegionError, RepoError};
use crate::graph::{Branch, CommitOptions, Fingerprint, MergeResult, Version, VersionGraph};
use crate::raster::Raster;
use crate::region::Region;
use crate::security::{LocalKeyring, SecurityProvider};
use crate::store::{ImageStore, SledVersionStore};
use crate::types::{Hash, VersionId};
use crate::visualize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the metadata directory inside a repository root.
pub const METADATA_DIR: &str = ".tessera";
const DB_DIR: &str = "db";
const KEYS_DIR: &str = "keys";

/// Result of comparing two versions.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Root hashes matched; no pixel work was done.
    pub identical: bool,
    /// Regions that differ, in region-tree order.
    pub regions: Vec<Region>,
    /// Differing commitment leaves, when both trees have the same leaf count.
    pub changed_leaves: Option<Vec<usize>>,
    /// The second image with differing regions outlined.
    pub visualization: Raster,
}

impl Comparison {
    fn identical(shown: &Raster) -> Self {
        Self {
            identical: true,
            regions: Vec::new(),
            changed_leaves: Some(Vec::new()),
            visualization: shown.to_color(),
        }
    }

    /// Diff two fingerprints built with the same parameters and outline the
    /// differing regions on `shown`.
    fn between(left: &Fingerprint, right: &Fingerprint, shown: &Raster) -> Result<Self, RepoError> {
        let regions = left.regions.find_different_regions(&right.regions)?;
        let changed_leaves = match left.commitment.find_differences(&right.commitment) {
            Ok(indices) => Some(indices),
            Err(CommitmentError::LeafCountMismatch { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            identical: false,
            visualization: visualize::highlight_differences(shown, &regions),
            regions,
            changed_leaves,
        })
    }
}

/// Membership proof for one region-tree leaf of a version.
#[derive(Debug, Clone)]
pub struct LeafProof {
    pub leaf_index: usize,
    pub region: Region,
    pub leaf_hash: Hash,
    pub root_hash: Hash,
    pub proof: InclusionProof,
}

impl LeafProof {
    pub fn verify(&self) -> bool {
        self.proof.verify(&self.leaf_hash, &self.root_hash, self.leaf_index)
    }
}

pub struct Repository {
    root: PathBuf,
    config: TesseraConfig,
    graph: VersionGraph,
    comparisons: ResultCache<Comparison>,
    renders: ResultCache<Raster>,
}

impl Repository {
    /// Create the metadata directory and default config if needed, then open.
    pub fn init<P: AsRef<Path>>(root: P) -> Result<Self, RepoError> {
        let root = root.as_ref();
        fs::create_dir_all(root.join(METADATA_DIR)).map_err(crate::error::StorageError::from)?;

        let config_path = repository_config_path(root);
        if !config_path.exists() {
            ConfigLoader::write(&TesseraConfig::default(), &config_path)?;
        }
        info!(root = %root.display(), "Initialized repository");
        Self::open(root)
    }

    /// Open an existing repository with its layered configuration.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, RepoError> {
        let root = root.as_ref();
        if !root.join(METADATA_DIR).is_dir() {
            return Err(RepoError::NotARepository(root.to_path_buf()));
        }
        let config = ConfigLoader::load(root)?;
        Self::open_with_config(root, config)
    }

    /// Open an existing repository with an explicit configuration.
    pub fn open_with_config<P: AsRef<Path>>(root: P, config: TesseraConfig) -> Result<Self, RepoError> {
        let root = root.as_ref().to_path_buf();
        let metadata = root.join(METADATA_DIR);
        if !metadata.is_dir() {
            return Err(RepoError::NotARepository(root));
        }
        config.validate()?;

        let store = SledVersionStore::new(metadata.join(DB_DIR))?;
        let images = ImageStore::new(&metadata)?;
        let security: Option<Arc<dyn SecurityProvider>> = if config.security.enabled {
            Some(Arc::new(LocalKeyring::open_or_create(metadata.join(KEYS_DIR))?))
        } else {
            None
        };
        let graph = VersionGraph::open(Box::new(store), images, security, config.graph_settings())?;

        debug!(root = %root.display(), "Opened repository");
        Ok(Self {
            comparisons: ResultCache::new(config.cache.capacity),
            renders: ResultCache::new(config.cache.capacity),
            root,
            config,
            graph,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    pub fn graph(&self) -> &VersionGraph {
        &self.graph
    }

    pub fn stage_image(&mut self, image: Raster) -> Result<(), RepoError> {
        self.graph.stage(image)
    }

    pub fn stage_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RepoError> {
        let image = Raster::load(path)?;
        self.graph.stage(image)
    }

    pub fn staged(&self) -> Option<&Raster> {
        self.graph.staged()
    }

    pub fn commit(&mut self, message: &str, options: &CommitOptions) -> Result<VersionId, RepoError> {
        self.graph.commit(message, options)
    }

    pub fn rollback(&mut self, version_id: &str, branch: Option<&str>) -> Result<(), RepoError> {
        self.graph.rollback_to_version(version_id, branch)
    }

    pub fn merge_branch(&mut self, branch: &str, message: &str) -> Result<MergeResult, RepoError> {
        self.graph.merge_branch(branch, message)
    }

    pub fn find_common_ancestor(&self, a: &str, b: &str) -> Option<VersionId> {
        self.graph.find_common_ancestor(a, b)
    }

    pub fn create_branch(
        &mut self,
        name: &str,
        start_point: Option<&str>,
        description: &str,
    ) -> Result<(), RepoError> {
        self.graph.create_branch(name, start_point, description)
    }

    pub fn switch_branch(&mut self, name: &str) -> Result<(), RepoError> {
        self.graph.switch_branch(name)
    }

    pub fn delete_branch(&mut self, name: &str) -> Result<(), RepoError> {
        self.graph.delete_branch(name)
    }

    pub fn list_versions(&self) -> Vec<&Version> {
        self.graph.versions()
    }

    pub fn version(&self, id: &str) -> Option<&Version> {
        self.graph.version(id)
    }

    pub fn current_version(&self) -> Option<&Version> {
        self.graph.current_version().and_then(|id| self.graph.version(id))
    }

    pub fn history(&self, start: Option<&str>) -> Result<Vec<&Version>, RepoError> {
        self.graph.history(start)
    }

    pub fn list_branches(&self) -> Vec<&Branch> {
        self.graph.branches()
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.graph.branch(name)
    }

    pub fn current_branch(&self) -> &str {
        self.graph.current_branch()
    }

    pub fn version_image(&self, id: &str) -> Result<Raster, RepoError> {
        self.graph.load_image(id)
    }

    pub fn has_changes(&self, image: &Raster) -> Result<bool, RepoError> {
        self.graph.has_changes(image)
    }

    pub fn verify_signature(&self, id: &str) -> Result<bool, RepoError> {
        self.graph.verify_signature(id)
    }

    fn require_version(&self, id: &str) -> Result<&Version, RepoError> {
        self.graph
            .version(id)
            .ok_or_else(|| RepoError::UnknownVersion(id.to_string()))
    }

    /// Compare two versions, localizing the regions that differ.
    ///
    /// Both versions are rebuilt with the parameters they were recorded
    /// with; versions recorded with different parameters are not comparable.
    /// Equal root hashes short-circuit to an identical result.
    pub fn compare_versions(&self, a: &str, b: &str) -> Result<Comparison, RepoError> {
        let version_a = self.require_version(a)?;
        let version_b = self.require_version(b)?;
        if version_a.params != version_b.params {
            return Err(RegionError::ParamsMismatch.into());
        }
        let image_a = self.graph.load_image(a)?;
        let image_b = self.graph.load_image(b)?;

        let params = format!(
            "{}|{}|{}",
            version_a.root_hash,
            version_b.root_hash,
            version_a.params.cache_fragment()
        );
        let key = cache_key("compare", &[&image_a, &image_b], &params);

        self.comparisons.get_or_try_insert_with(key, || {
            if version_a.root_hash == version_b.root_hash {
                debug!(a = %a, b = %b, "Root hashes match");
                return Ok(Comparison::identical(&image_b));
            }

            let left = self.graph.fingerprint_with(&image_a, &version_a.params)?;
            let right = self.graph.fingerprint_with(&image_b, &version_b.params)?;
            let comparison = Comparison::between(&left, &right, &image_b)?;
            info!(a = %a, b = %b, regions = comparison.regions.len(), "Compared versions");
            Ok(comparison)
        })
    }

    /// Compare `image` against the current version, using that version's
    /// recorded parameters. The visualization is drawn over `image`.
    pub fn compare_with_current(&self, image: &Raster) -> Result<Comparison, RepoError> {
        let current = self
            .graph
            .current_version()
            .and_then(|id| self.graph.version(id))
            .ok_or_else(|| RepoError::EmptyBranch(self.graph.current_branch().to_string()))?;
        let head_image = self.graph.load_image(&current.id)?;
        let fingerprint = self.graph.fingerprint_with(image, &current.params)?;

        let params = format!(
            "{}|{}|{}",
            current.root_hash,
            fingerprint.root_hash(),
            current.params.cache_fragment()
        );
        let key = cache_key("compare_current", &[&head_image, image], &params);

        self.comparisons.get_or_try_insert_with(key, || {
            if fingerprint.root_hash() == current.root_hash {
                debug!(version = %current.id, "Image matches current version");
                return Ok(Comparison::identical(image));
            }

            let head = self.graph.fingerprint_with(&head_image, &current.params)?;
            let comparison = Comparison::between(&head, &fingerprint, image)?;
            info!(version = %current.id, regions = comparison.regions.len(), "Compared with current version");
            Ok(comparison)
        })
    }

    /// Compare the staged image against the current version.
    pub fn compare_staged(&self) -> Result<Comparison, RepoError> {
        let staged = self.graph.staged().ok_or(RepoError::NothingStaged)?;
        self.compare_with_current(staged)
    }

    /// Render a version's region-tree leaves over its image.
    pub fn visualize_regions(&self, id: &str) -> Result<Raster, RepoError> {
        let version = self.require_version(id)?;
        let image = self.graph.load_image(id)?;
        let params = format!("{}|{}", version.root_hash, version.params.cache_fragment());
        let key = cache_key("regions", &[&image], &params);

        self.renders.get_or_try_insert_with(key, || {
            let fingerprint = self.graph.fingerprint_with(&image, &version.params)?;
            Ok(visualize::draw_region_tree(&image, &fingerprint.regions))
        })
    }

    /// Prove that leaf `leaf_index` of a version's region tree is committed
    /// to by the version's root hash.
    pub fn leaf_proof(&self, id: &str, leaf_index: usize) -> Result<LeafProof, RepoError> {
        let version = self.require_version(id)?;
        let image = self.graph.load_image(id)?;
        let fingerprint = self.graph.fingerprint_with(&image, &version.params)?;
        let commitment: &CommitmentTree = &fingerprint.commitment;

        let proof = commitment.proof(leaf_index)?;
        let region = fingerprint.regions.leaf_regions()[leaf_index];
        Ok(LeafProof {
            leaf_index,
            region,
            leaf_hash: commitment.leaves()[leaf_index].clone(),
            root_hash: version.root_hash.clone(),
            proof,
        })
    }
}
