// crates/qlog-core/src/core/hashing.rs
// ============================================================================
// Module: Skeleton Hashing
// Description: Fixed-width content digests of canonical query text.
// Purpose: Provide the primary key of the skeleton table.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! A skeleton hash is the first 128 bits of SHA-256 over the UTF-8 bytes of
//! the canonical query text. Identical text always yields the identical hash;
//! distinct text colliding is treated as a hash failure by the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde::Serializer;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Digest width in bytes.
pub const SKELETON_HASH_BYTES: usize = 16;

// ============================================================================
// SECTION: Skeleton Hash
// ============================================================================

/// Content digest of a canonical query skeleton.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkeletonHash([u8; SKELETON_HASH_BYTES]);

impl SkeletonHash {
    /// Hashes canonical skeleton text.
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut bytes = [0_u8; SKELETON_HASH_BYTES];
        bytes.copy_from_slice(&digest[.. SKELETON_HASH_BYTES]);
        Self(bytes)
    }

    /// Rebuilds a hash from stored bytes.
    ///
    /// Returns `None` when the slice is not exactly [`SKELETON_HASH_BYTES`] long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; SKELETON_HASH_BYTES] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SKELETON_HASH_BYTES] {
        &self.0
    }

    /// Returns the digest as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Debug for SkeletonHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkeletonHash({})", self.to_hex())
    }
}

impl fmt::Display for SkeletonHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SkeletonHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
