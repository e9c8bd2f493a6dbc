//! Error types for the image version-control engine.

use crate::types::{BranchName, VersionId};
use thiserror::Error;

/// Region tree construction and comparison errors
#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("Image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Invalid region {x},{y} {width}x{height} in {image_width}x{image_height} image")]
    InvalidRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Invalid region parameters: {0}")]
    InvalidParams(String),

    #[error("Region trees were built with different parameters")]
    ParamsMismatch,

    #[error("Region trees cover different image sizes: {left:?} vs {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
}

/// Commitment tree errors
#[derive(Debug, Error, PartialEq)]
pub enum CommitmentError {
    #[error("Leaf count mismatch: {left} vs {right}")]
    LeafCountMismatch { left: usize, right: usize },

    #[error("Odd-node policy mismatch between trees")]
    PolicyMismatch,

    #[error("Leaf index {index} out of range (tree has {len} leaves)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Raster decode/encode errors
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u8),

    #[error("Pixel buffer length {actual} does not match {width}x{height}x{channels}")]
    BufferLength {
        width: u32,
        height: u32,
        channels: u8,
        actual: usize,
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Security collaborator errors
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    EncryptFailed,

    #[error("Decryption failed")]
    DecryptFailed,

    #[error("No security provider configured")]
    Unavailable,

    #[error("Keyring I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("Payload not found for version: {0}")]
    PayloadNotFound(VersionId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Errors surfaced at the repository boundary
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("No image staged for commit")]
    NothingStaged,

    #[error("Unknown version: {0}")]
    UnknownVersion(VersionId),

    #[error("Unknown branch: {0}")]
    UnknownBranch(BranchName),

    #[error("Branch already exists: {0}")]
    BranchExists(BranchName),

    #[error("Cannot delete the current branch: {0}")]
    CannotDeleteCurrentBranch(BranchName),

    #[error("Cannot delete the permanent branch: {0}")]
    CannotDeletePermanentBranch(BranchName),

    #[error("Versions {0} and {1} share no common ancestor")]
    NoCommonAncestor(VersionId, VersionId),

    #[error("Branch has no versions: {0}")]
    EmptyBranch(BranchName),

    #[error("Image unavailable for version {0}")]
    ImageUnavailable(VersionId),

    #[error("Not a repository: {0}")]
    NotARepository(std::path::PathBuf),

    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    #[error("Commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}
