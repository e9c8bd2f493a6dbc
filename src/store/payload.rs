//! Image payload storage
//!
//! Stores each version's encoded image as a file named after the version id:
//! `{root}/objects/{id[0..2]}/{id}.png`, or `.png.enc` when encrypted. The
//! single staging slot lives at `{root}/staging/staged.png`.

use crate::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

const OBJECTS_DIR: &str = "objects";
const STAGING_DIR: &str = "staging";
const STAGED_FILE: &str = "staged.png";

/// Filesystem storage for version payloads and the staged image
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Create a new ImageStore at the given root path
    ///
    /// The object and staging directories are created as needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        for dir in [root.join(OBJECTS_DIR), root.join(STAGING_DIR)] {
            fs::create_dir_all(&dir).map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory at {:?}: {}", dir, e),
                ))
            })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a version's payload file.
    pub fn payload_path(&self, version_id: &str, encrypted: bool) -> PathBuf {
        let prefix = version_id.get(0..2).unwrap_or(version_id);
        let extension = if encrypted { "png.enc" } else { "png" };
        self.root
            .join(OBJECTS_DIR)
            .join(prefix)
            .join(format!("{}.{}", version_id, extension))
    }

    pub fn has_payload(&self, version_id: &str, encrypted: bool) -> bool {
        self.payload_path(version_id, encrypted).exists()
    }

    /// Store a payload with write-to-temp then rename.
    pub fn write_payload(
        &self,
        version_id: &str,
        bytes: &[u8],
        encrypted: bool,
    ) -> Result<PathBuf, StorageError> {
        let path = self.payload_path(version_id, encrypted);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    pub fn read_payload(&self, version_id: &str, encrypted: bool) -> Result<Vec<u8>, StorageError> {
        let path = self.payload_path(version_id, encrypted);
        if !path.exists() {
            return Err(StorageError::PayloadNotFound(version_id.to_string()));
        }
        Ok(fs::read(&path)?)
    }

    fn staged_path(&self) -> PathBuf {
        self.root.join(STAGING_DIR).join(STAGED_FILE)
    }

    pub fn write_staged(&self, bytes: &[u8]) -> Result<(), StorageError> {
        write_atomic(&self.staged_path(), bytes)
    }

    /// Bytes of the staged image, if one is waiting.
    pub fn read_staged(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.staged_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    pub fn clear_staged(&self) -> Result<(), StorageError> {
        let path = self.staged_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, bytes).map_err(|e| {
        StorageError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to write {:?}: {}", temp_path, e),
        ))
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to rename temp file to {:?}: {}", path, e),
        ))
    })
}
