//! In-memory proof storage.
//!
//! Keeps packed proofs in a `BTreeMap` keyed by point with a side index
//! from height to the newest point that finalized it. Nothing survives a
//! restart, which makes it the engine of choice for tests and tooling.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::{check_proof_advances, ProofStorage};
use crate::error::ProofStorageResult;
use crate::model::{
    FinalizationPoint, FinalizationProof, FinalizationStatistics, Height, HeightHashPair,
    HeightHashPairRange, PackedFinalizationProof,
};

/// Proof storage held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryProofStorage {
    /// Packed proofs indexed by point.
    proofs: BTreeMap<FinalizationPoint, Arc<PackedFinalizationProof>>,
    /// Height to the newest point that finalized it.
    heights: BTreeMap<Height, FinalizationPoint>,
    statistics: FinalizationStatistics,
}

impl MemoryProofStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `proofs`, saved in order.
    pub fn with_proofs(proofs: &[FinalizationProof]) -> ProofStorageResult<Self> {
        let mut storage = Self::new();
        for proof in proofs {
            storage.save_proof(proof.height, proof)?;
        }
        Ok(storage)
    }

    /// Number of stored proofs.
    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }
}

impl ProofStorage for MemoryProofStorage {
    fn statistics(&self) -> ProofStorageResult<FinalizationStatistics> {
        Ok(self.statistics)
    }

    fn load_finalized_hashes_from(
        &self,
        point: FinalizationPoint,
        max_hashes: usize,
    ) -> ProofStorageResult<HeightHashPairRange> {
        if max_hashes == 0 || point > self.statistics.point {
            return Ok(HeightHashPairRange::empty());
        }

        // Cloning the Arcs detaches the range from this store; pairs are
        // only built as the caller iterates.
        let snapshot: Vec<Arc<PackedFinalizationProof>> = self
            .proofs
            .range(point..=self.statistics.point)
            .take(max_hashes)
            .map(|(_, proof)| Arc::clone(proof))
            .collect();
        let source = snapshot
            .into_iter()
            .map(|proof| Ok(HeightHashPair::new(proof.height(), proof.hash())));
        Ok(HeightHashPairRange::from_source(source, max_hashes))
    }

    fn load_proof(
        &self,
        point: FinalizationPoint,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>> {
        let proof = self.proofs.get(&point).cloned();
        if proof.is_none() {
            debug!(%point, "no proof at point");
        }
        Ok(proof)
    }

    fn load_proof_at_height(
        &self,
        height: Height,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>> {
        match self.heights.get(&height) {
            Some(point) => self.load_proof(*point),
            None => {
                debug!(%height, "no proof at height");
                Ok(None)
            }
        }
    }

    fn save_proof(
        &mut self,
        height: Height,
        proof: &FinalizationProof,
    ) -> ProofStorageResult<()> {
        check_proof_advances(&self.statistics, height, proof)?;

        let packed = Arc::new(PackedFinalizationProof::pack(proof)?);
        self.proofs.insert(proof.point, packed);
        self.heights.insert(height, proof.point);
        self.statistics = FinalizationStatistics::from_proof(proof);

        info!(point = %proof.point, %height, votes = proof.vote_count(), "proof saved");
        Ok(())
    }
}
