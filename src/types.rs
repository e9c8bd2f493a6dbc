//! Shared identifiers used across the crate.

/// Lowercase hex BLAKE3 digest (64 characters).
///
/// An empty string stands for "no content" (e.g. the root of an empty
/// commitment tree).
pub type Hash = String;

/// Random, content-independent version identifier.
pub type VersionId = String;

/// Branch name.
pub type BranchName = String;

/// The branch every repository starts with. It can never be deleted.
pub const MAIN_BRANCH: &str = "main";

/// Length of a hex-encoded digest.
pub const HASH_HEX_LEN: usize = 64;
