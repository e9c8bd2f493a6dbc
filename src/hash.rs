//! Content hashing using BLAKE3
//!
//! All digests are rendered as 64-character lowercase hex strings so they can
//! be concatenated, persisted and compared as text.

use crate::types::Hash;
use blake3::Hasher;

/// Compute the hash of a rectangular block of pixels.
///
/// LeafHash = hash("leaf" || width || height || channels || row_0 || .. || row_n)
///
/// The shape header keeps two blocks with the same bytes but different
/// geometry from colliding. Rows must be supplied top to bottom.
pub fn compute_leaf_hash<'a, I>(width: u32, height: u32, channels: u8, rows: I) -> Hash
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Hasher::new();

    hasher.update(b"leaf");
    hasher.update(&width.to_be_bytes());
    hasher.update(&height.to_be_bytes());
    hasher.update(&[channels]);

    for row in rows {
        hasher.update(row);
    }

    hasher.finalize().to_hex().to_string()
}

/// Combine four child hashes in top-left, top-right, bottom-left,
/// bottom-right order.
pub fn combine_quad(children: [&str; 4]) -> Hash {
    let mut hasher = Hasher::new();
    for child in children {
        hasher.update(child.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Combine a left and right hash: H(left || right)
pub fn combine_pair(left: &str, right: &str) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Compute a generic hash of arbitrary data
pub fn compute_hash(data: &[u8]) -> Hash {
    blake3::hash(data).to_hex().to_string()
}
