//! Tessera: Image Version Control
//!
//! Tracks successive states of a raster image as immutable versions.
//! Each image is decomposed into a quadtree of homogeneous regions whose
//! leaf hashes feed a Merkle commitment; the commitment root is the
//! version's fingerprint. Versions are organized into branches that can be
//! merged pixel-by-pixel, and any two versions can be compared down to the
//! regions that differ.

pub mod cache;
pub mod commitment;
pub mod config;
pub mod error;
pub mod graph;
pub mod hash;
pub mod logging;
pub mod merge;
pub mod raster;
pub mod region;
pub mod repository;
pub mod security;
pub mod store;
pub mod types;
pub mod visualize;

pub use commitment::{CommitmentTree, InclusionProof, OddNodePolicy};
pub use config::{ConfigLoader, TesseraConfig};
pub use error::RepoError;
pub use graph::{Branch, CommitOptions, MergeResult, Version, VersionGraph};
pub use raster::Raster;
pub use region::{Region, RegionParams, RegionTree};
pub use repository::{Comparison, Repository};
