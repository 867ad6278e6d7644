//! # Proof Storage Configuration & Constants
//!
//! Every storage constant lives here, next to the configuration struct a
//! node uses to pick and tune its proof storage engine.
//!
//! The on-disk constants (format version, tree names) are part of the
//! persistent data. Changing them means existing databases stop opening,
//! so bump [`PACKED_PROOF_FORMAT_VERSION`] instead of editing in place.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ProofStorageError, ProofStorageResult};

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// Version byte prefixed to every packed proof.
pub const PACKED_PROOF_FORMAT_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// sled Tree Names
// ---------------------------------------------------------------------------

/// Packed proofs keyed by point (8B BE).
pub const PROOFS_TREE: &str = "proofs";

/// `height (8B BE) || hash (32B)` keyed by point (8B BE).
pub const FINALIZED_HASHES_TREE: &str = "finalized_hashes";

/// Latest point (8B BE) keyed by height (8B BE).
pub const HEIGHT_INDEX_TREE: &str = "height_index";

/// Miscellaneous values, currently only the statistics record.
pub const METADATA_TREE: &str = "metadata";

/// Key of the bincode-encoded `FinalizationStatistics` in [`METADATA_TREE`].
pub const META_STATISTICS: &[u8] = b"statistics";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Upper bound on an encoded proof payload. A 10k-validator quorum with
/// 64-byte signatures stays well below it; anything larger is rejected on
/// save and treated as corruption on load.
pub const MAX_PACKED_PROOF_BYTES: u64 = 4 * 1024 * 1024;

/// Default sled page cache size. 64 MiB is plenty for proof data, which is
/// small and mostly read from the tip.
pub const DEFAULT_CACHE_CAPACITY_BYTES: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// ProofStorageConfig
// ---------------------------------------------------------------------------

/// Which storage engine backs the proof cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Everything in process memory. Lost on restart.
    Memory,
    /// sled database under `data_dir`.
    Sled,
}

/// Settings for opening a proof storage engine.
///
/// Loaded from the node's JSON configuration; any missing field takes its
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofStorageConfig {
    pub backend: StorageBackend,
    /// Directory for the sled database. Required for `sled` unless
    /// `temporary` is set.
    pub data_dir: Option<PathBuf>,
    /// Open a throwaway sled database that is deleted on drop.
    pub temporary: bool,
    /// Flush sled to disk after every saved proof.
    pub flush_on_save: bool,
    /// sled page cache size in bytes.
    pub cache_capacity_bytes: u64,
}

impl Default for ProofStorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: None,
            temporary: false,
            flush_on_save: true,
            cache_capacity_bytes: DEFAULT_CACHE_CAPACITY_BYTES,
        }
    }
}

impl ProofStorageConfig {
    /// In-memory storage, mainly for tests and tools.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Persistent sled storage rooted at `data_dir`.
    pub fn sled(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::Sled,
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// sled storage that disappears when the engine is dropped.
    pub fn sled_temporary() -> Self {
        Self {
            backend: StorageBackend::Sled,
            temporary: true,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> ProofStorageResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProofStorageError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations no engine can open.
    pub fn validate(&self) -> ProofStorageResult<()> {
        if self.backend == StorageBackend::Sled && !self.temporary && self.data_dir.is_none() {
            return Err(ProofStorageError::InvalidConfig(
                "sled backend requires data_dir unless temporary is set".to_string(),
            ));
        }
        if self.backend == StorageBackend::Sled && self.cache_capacity_bytes == 0 {
            return Err(ProofStorageError::InvalidConfig(
                "cache_capacity_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
