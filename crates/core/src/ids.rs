//! Deterministic id coining for files and directories.
//!
//! Ids are the first 16 hex characters of a BLAKE3 digest of the relative
//! path. Directory ids are namespaced with a `"dir:"` prefix so a directory
//! can never collide with a file of the same relative path.

/// Derive a stable id for a file's workspace-relative path.
pub fn file_id(relative_path: &str) -> String {
    digest16(relative_path)
}

/// Derive a stable id for a directory's workspace-relative path.
pub fn dir_id(relative_path: &str) -> String {
    digest16(&format!("dir:{relative_path}"))
}

fn digest16(input: &str) -> String {
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..16].to_string()
}
