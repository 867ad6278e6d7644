//! # Storage Engines
//!
//! The [`ProofStorage`] trait is the capability set the guard in
//! [`crate::cache`] wraps. Two engines ship with the crate:
//!
//! ```text
//! memory.rs      — MemoryProofStorage, BTreeMaps in process memory
//! persistent.rs  — SledProofStorage, sled trees on disk
//! ```
//!
//! ## Append-Only Rule
//!
//! Every engine runs [`check_proof_advances`] before it writes. A proof is
//! accepted only if its point is strictly newer than the last committed
//! point and its height is not below the finalized height. Several points
//! may finalize the same height; the newest one wins height lookups.
//!
//! ## Thread Safety
//!
//! Engines are `Send + Sync` but are not expected to synchronize
//! themselves. Reads take `&self` and the single write method takes
//! `&mut self`, so exclusivity comes from whoever owns the engine. In
//! practice that is always [`crate::cache::ProofStorageCache`].

pub mod memory;
pub mod persistent;

use std::sync::Arc;

use tracing::info;

use crate::config::{ProofStorageConfig, StorageBackend};
use crate::error::{ProofStorageError, ProofStorageResult};
use crate::model::{
    FinalizationPoint, FinalizationProof, FinalizationStatistics, Height, HeightHashPairRange,
    PackedFinalizationProof,
};

pub use memory::MemoryProofStorage;
pub use persistent::SledProofStorage;

/// Load and save operations over finalization proofs.
pub trait ProofStorage: Send + Sync {
    /// Summary of the latest committed proof.
    fn statistics(&self) -> ProofStorageResult<FinalizationStatistics>;

    /// Latest committed point, 0 when empty.
    fn finalization_point(&self) -> ProofStorageResult<FinalizationPoint> {
        Ok(self.statistics()?.point)
    }

    /// Latest finalized height, 0 when empty.
    fn finalized_height(&self) -> ProofStorageResult<Height> {
        Ok(self.statistics()?.height)
    }

    /// Up to `max_hashes` finalized `(height, hash)` pairs, one per point,
    /// starting at `point` and ending at the point committed when the call
    /// was made.
    fn load_finalized_hashes_from(
        &self,
        point: FinalizationPoint,
        max_hashes: usize,
    ) -> ProofStorageResult<HeightHashPairRange>;

    /// The proof committed at `point`, if any.
    fn load_proof(
        &self,
        point: FinalizationPoint,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>>;

    /// The newest proof that finalized `height`, if any.
    fn load_proof_at_height(
        &self,
        height: Height,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>>;

    /// Commits `proof` as finalization evidence for `height`.
    fn save_proof(&mut self, height: Height, proof: &FinalizationProof)
        -> ProofStorageResult<()>;
}

/// Verifies that saving `proof` at `height` keeps storage append-only.
pub fn check_proof_advances(
    current: &FinalizationStatistics,
    height: Height,
    proof: &FinalizationProof,
) -> ProofStorageResult<()> {
    if proof.height != height {
        return Err(ProofStorageError::HeightMismatch {
            height,
            proof_height: proof.height,
        });
    }
    if proof.point <= current.point {
        return Err(ProofStorageError::StalePoint {
            point: proof.point,
            current: current.point,
        });
    }
    if height < current.height {
        return Err(ProofStorageError::StaleHeight {
            height,
            current: current.height,
        });
    }
    Ok(())
}

/// Opens the engine selected by `config`.
pub fn open_storage(config: &ProofStorageConfig) -> ProofStorageResult<Box<dyn ProofStorage>> {
    config.validate()?;
    let storage: Box<dyn ProofStorage> = match config.backend {
        StorageBackend::Memory => Box::new(MemoryProofStorage::new()),
        StorageBackend::Sled => Box::new(SledProofStorage::open_with_config(config)?),
    };
    info!(backend = ?config.backend, "proof storage opened");
    Ok(storage)
}
