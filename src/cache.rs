//! Memoization cache for comparison and visualization results
//!
//! Keys combine an operation name, a coarse fingerprint of each input image
//! and the parameters that influence the result. When an insert would push
//! the cache past its capacity the whole map is dropped.

use crate::hash::compute_hash;
use crate::raster::Raster;
use parking_lot::Mutex;
use std::collections::HashMap;

const FINGERPRINT_SIZE: u32 = 32;
const FINGERPRINT_HEX_LEN: usize = 16;

pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, V>>,
    capacity: usize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.clear();
        }
        entries.insert(key, value);
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// The lock is not held while `compute` runs; a failed computation
    /// leaves the cache untouched.
    pub fn get_or_try_insert_with<E, F>(&self, key: String, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Dimensions plus a short digest of a 32x32 downsample.
pub fn image_fingerprint(raster: &Raster) -> String {
    let thumbnail = raster.downsample(FINGERPRINT_SIZE, FINGERPRINT_SIZE);
    let digest = compute_hash(thumbnail.as_bytes());
    format!(
        "{}x{}x{}:{}",
        raster.width(),
        raster.height(),
        raster.channels(),
        &digest[..FINGERPRINT_HEX_LEN]
    )
}

/// Build a cache key from an operation name, its input images and parameters.
pub fn cache_key(operation: &str, images: &[&Raster], params: &str) -> String {
    let mut key = String::from(operation);
    for image in images {
        key.push('|');
        key.push_str(&image_fingerprint(image));
    }
    key.push('|');
    key.push_str(params);
    key
}
