//! Deterministic, content-addressed record identities.
//!
//! An id is the first [`ID_LEN`] hex characters of the SHA-256 digest of a
//! caller-supplied key. Only the key is hashed, so the same key always yields the
//! same id and re-running identity assignment over unchanged input is a no-op.
//!
//! Collisions are an accepted risk: 48 bits of digest is ample for a corpus of a
//! few tens of thousands of commands, and nothing here detects or retries them.
//! Two keys that collide would be merged by the reconciler as one identity.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Length of an id in hex characters.
pub const ID_LEN: usize = 12;

/// Hash `key` into a fixed-length id.
pub fn assign_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(ID_LEN);
    for b in digest.iter().take(ID_LEN / 2) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Key used when the shell namespace of a command is known (`bash:tar`).
pub fn namespace_key(namespace: &str, command: &str) -> String {
    format!("{namespace}:{command}")
}

/// Fallback key when no namespace is available (`tar -xf-file-management`).
pub fn category_key(command: &str, category: &str) -> String {
    format!("{command}-{category}")
}
