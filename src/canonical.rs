//! Canonical serialization for run fingerprints.
//!
//! Fingerprints of the input table, the sensitive-path set and the emitted
//! rows are computed from canonical JSON so two runs over the same data can
//! be compared from their manifests alone.
//!
//! - Struct fields serialize in declaration order
//! - Vectors serialize in index order
//! - Sets are sorted before hashing (see [`crate::classifier::SensitivePathSet::fingerprint`])

use serde::Serialize;
use xxhash_rust::xxh64::{xxh64, Xxh64};

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Incremental canonical hash over a sequence of values.
///
/// Equivalent inputs fed in the same order give the same digest, without
/// holding the whole sequence in memory.
pub struct Fingerprinter {
    state: Xxh64,
    count: u64,
}

impl Fingerprinter {
    /// Start an empty fingerprint.
    pub fn new() -> Self {
        Self {
            state: Xxh64::new(0),
            count: 0,
        }
    }

    /// Feed one value.
    pub fn update<T: Serialize>(&mut self, value: &T) {
        let bytes = to_canonical_bytes(value);
        self.state.update(&(bytes.len() as u64).to_le_bytes());
        self.state.update(&bytes);
        self.count += 1;
    }

    /// Number of values fed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Digest as hex.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.state.digest())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
