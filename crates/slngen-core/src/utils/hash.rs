//! Blake3 hashing utilities for stable identities.
//!
//! Projects without a declared `ProjectGuid`, and generated solution folders,
//! get a GUID derived from a hash of a stable key so regenerated solutions
//! stay byte-identical.

use uuid::Uuid;

/// Derive a UUID from the first 16 bytes of the Blake3 hash of `key`
pub fn stable_uuid(key: &str) -> Uuid {
    let hash = blake3::hash(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    Uuid::from_bytes(bytes)
}
