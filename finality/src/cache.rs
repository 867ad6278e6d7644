//! # Proof Storage Cache — Scoped Access to Proof Storage
//!
//! [`ProofStorageCache`] owns a storage engine and a reader-writer lock,
//! and is the only way to reach that engine. Callers borrow it through
//! short-lived accessors:
//!
//! ```text
//!                     ┌──────────────────────────┐
//!   view()     ──────▶│ ProofStorageView         │  shared lock, reads only
//!                     ├──────────────────────────┤
//!   modifier() ──────▶│ ProofStorageModifier     │  exclusive lock, save_proof
//!                     └────────────┬─────────────┘
//!                                  ▼
//!                        Box<dyn ProofStorage>
//! ```
//!
//! An accessor wraps the lock guard itself, so dropping the accessor
//! releases the lock on every path out of the caller's scope, including
//! `?` returns and panics.
//!
//! ## Lock States
//!
//! ```text
//! Idle ──view()──▶ ReadersActive(1) ──view()──▶ ReadersActive(n+1)
//!  ▲                     │ drop last view
//!  ├─────────────────────┘
//!  │
//!  └──drop── WriterActive ◀──modifier()── Idle
//! ```
//!
//! Readers and a writer are never active together: `modifier()` parks
//! until every view is dropped, and `view()` parks while a modifier lives.
//!
//! ## Fairness
//!
//! The lock is a `parking_lot::RwLock`, which is task-fair. Once a writer
//! is queued, newly arriving readers park behind it, so a continuous stream
//! of readers cannot starve finalization commits. The flip side is that a
//! thread must not take a second view while it still holds one: if a writer
//! queued in between, the second `view()` waits for that writer, which in
//! turn waits for the first view.
//!
//! ## Sharing
//!
//! There is no global instance. Create one cache at startup and hand
//! `Arc<ProofStorageCache>` to every component that reads or commits
//! proofs. Accessors borrow the cache and are `!Send`; they live for one
//! logical operation on one thread.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{trace, warn};

use crate::config::ProofStorageConfig;
use crate::error::ProofStorageResult;
use crate::model::{
    FinalizationPoint, FinalizationProof, FinalizationStatistics, Height, HeightHashPairRange,
    PackedFinalizationProof,
};
use crate::storage::{open_storage, ProofStorage};

// ---------------------------------------------------------------------------
// ProofStorageCache
// ---------------------------------------------------------------------------

/// Sole owner of a proof storage engine, arbitrating concurrent access.
pub struct ProofStorageCache {
    storage: RwLock<Box<dyn ProofStorage>>,
}

impl ProofStorageCache {
    /// Takes ownership of `storage`.
    pub fn new<S: ProofStorage + 'static>(storage: S) -> Self {
        Self::from_boxed(Box::new(storage))
    }

    /// Takes ownership of an already boxed engine.
    pub fn from_boxed(storage: Box<dyn ProofStorage>) -> Self {
        Self {
            storage: RwLock::new(storage),
        }
    }

    /// Opens the engine described by `config` and wraps it.
    pub fn open(config: &ProofStorageConfig) -> ProofStorageResult<Self> {
        Ok(Self::from_boxed(open_storage(config)?))
    }

    /// Acquires shared access.
    ///
    /// Returns immediately when no writer holds or waits for the lock,
    /// otherwise blocks until the writer is done. Do not call this while
    /// the current thread already holds a view; see the module docs.
    pub fn view(&self) -> ProofStorageView<'_> {
        let storage = self.storage.read();
        trace!("proof storage view acquired");
        ProofStorageView { storage }
    }

    /// Acquires exclusive access, blocking until every view and any other
    /// modifier have been dropped.
    pub fn modifier(&self) -> ProofStorageModifier<'_> {
        let storage = self.storage.write();
        trace!("proof storage modifier acquired");
        ProofStorageModifier { storage }
    }
}

impl fmt::Debug for ProofStorageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofStorageCache")
            .field("locked_exclusive", &self.storage.is_locked_exclusive())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ProofStorageView
// ---------------------------------------------------------------------------

/// Read-only access to proof storage, valid while the shared lock is held.
///
/// Everything returned is owned or `Arc`-shared and stays valid after the
/// view is dropped.
pub struct ProofStorageView<'a> {
    storage: RwLockReadGuard<'a, Box<dyn ProofStorage>>,
}

impl ProofStorageView<'_> {
    /// Latest committed point.
    pub fn finalization_point(&self) -> ProofStorageResult<FinalizationPoint> {
        self.storage.finalization_point()
    }

    /// Latest finalized height.
    pub fn finalized_height(&self) -> ProofStorageResult<Height> {
        self.storage.finalized_height()
    }

    pub fn statistics(&self) -> ProofStorageResult<FinalizationStatistics> {
        self.storage.statistics()
    }

    /// Up to `max_hashes` finalized `(height, hash)` pairs starting at
    /// `point`, bounded by what is committed now.
    pub fn load_finalized_hashes_from(
        &self,
        point: FinalizationPoint,
        max_hashes: usize,
    ) -> ProofStorageResult<HeightHashPairRange> {
        self.storage.load_finalized_hashes_from(point, max_hashes)
    }

    /// Proof committed at `point`, `None` if that point was never committed.
    pub fn load_proof(
        &self,
        point: FinalizationPoint,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>> {
        self.storage.load_proof(point)
    }

    /// Newest proof finalizing `height`, `None` if the height was never
    /// finalized.
    pub fn load_proof_at_height(
        &self,
        height: Height,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>> {
        self.storage.load_proof_at_height(height)
    }
}

impl Drop for ProofStorageView<'_> {
    fn drop(&mut self) {
        trace!("proof storage view released");
    }
}

// ---------------------------------------------------------------------------
// ProofStorageModifier
// ---------------------------------------------------------------------------

/// Exclusive write access to proof storage.
pub struct ProofStorageModifier<'a> {
    storage: RwLockWriteGuard<'a, Box<dyn ProofStorage>>,
}

impl ProofStorageModifier<'_> {
    /// Commits `proof` as the finalization evidence for `height`.
    ///
    /// Engine errors (stale point or height, I/O) are returned as-is and
    /// nothing is retried. Views opened after this modifier is dropped see
    /// the new point and height.
    pub fn save_proof(
        &mut self,
        height: Height,
        proof: &FinalizationProof,
    ) -> ProofStorageResult<()> {
        self.storage.save_proof(height, proof).map_err(|e| {
            warn!(%height, point = %proof.point, error = %e, "proof save failed");
            e
        })
    }
}

impl Drop for ProofStorageModifier<'_> {
    fn drop(&mut self) {
        trace!("proof storage modifier released");
    }
}
