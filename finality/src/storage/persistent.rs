//! # SledProofStorage — Persistent Proof Storage
//!
//! Proof storage on top of sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree               | Key             | Value                            |
//! |--------------------|-----------------|----------------------------------|
//! | `proofs`           | `point` (8B BE) | packed proof bytes               |
//! | `finalized_hashes` | `point` (8B BE) | `height` (8B BE) ‖ `hash` (32B)  |
//! | `height_index`     | `height` (8B BE)| newest `point` (8B BE)           |
//! | `metadata`         | `statistics`    | `bincode(FinalizationStatistics)`|
//!
//! Big-endian keys keep sled's lexicographic order equal to numeric order,
//! so hash ranges are plain range scans over `finalized_hashes`.
//!
//! ## Atomicity
//!
//! A save touches all four trees inside one sled transaction. Either the
//! proof, both indexes, and the new statistics land together, or none of
//! them do.

use std::path::Path;
use std::sync::Arc;

use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};
use tracing::{debug, info};

use super::{check_proof_advances, ProofStorage};
use crate::config::{
    ProofStorageConfig, FINALIZED_HASHES_TREE, HEIGHT_INDEX_TREE, METADATA_TREE,
    META_STATISTICS, PROOFS_TREE,
};
use crate::error::{ProofStorageError, ProofStorageResult};
use crate::model::{
    FinalizationPoint, FinalizationProof, FinalizationStatistics, Hash256, Height,
    HeightHashPair, HeightHashPairRange, PackedFinalizationProof,
};

/// Size of a `finalized_hashes` value.
const HASH_ENTRY_LEN: usize = 8 + 32;

/// Persistent proof storage backed by sled.
#[derive(Debug)]
pub struct SledProofStorage {
    db: Db,
    proofs: Tree,
    finalized_hashes: Tree,
    height_index: Tree,
    metadata: Tree,
    flush_on_save: bool,
}

impl SledProofStorage {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> ProofStorageResult<Self> {
        Self::open_with_config(&ProofStorageConfig::sled(path.as_ref()))
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> ProofStorageResult<Self> {
        Self::open_with_config(&ProofStorageConfig::sled_temporary())
    }

    /// Open a database as described by `config`. The `backend` field is
    /// not consulted.
    pub fn open_with_config(config: &ProofStorageConfig) -> ProofStorageResult<Self> {
        let mut sled_config = sled::Config::new().cache_capacity(config.cache_capacity_bytes);
        if config.temporary {
            sled_config = sled_config.temporary(true);
        } else {
            let dir = config.data_dir.as_ref().ok_or_else(|| {
                ProofStorageError::InvalidConfig("sled storage requires data_dir".to_string())
            })?;
            sled_config = sled_config.path(dir);
        }
        Self::from_db(sled_config.open()?, config.flush_on_save)
    }

    fn from_db(db: Db, flush_on_save: bool) -> ProofStorageResult<Self> {
        let proofs = db.open_tree(PROOFS_TREE)?;
        let finalized_hashes = db.open_tree(FINALIZED_HASHES_TREE)?;
        let height_index = db.open_tree(HEIGHT_INDEX_TREE)?;
        let metadata = db.open_tree(METADATA_TREE)?;

        Ok(Self {
            db,
            proofs,
            finalized_hashes,
            height_index,
            metadata,
            flush_on_save,
        })
    }

    /// Number of stored proofs.
    pub fn proof_count(&self) -> usize {
        self.proofs.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> ProofStorageResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl ProofStorage for SledProofStorage {
    fn statistics(&self) -> ProofStorageResult<FinalizationStatistics> {
        match self.metadata.get(META_STATISTICS)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(FinalizationStatistics::default()),
        }
    }

    fn load_finalized_hashes_from(
        &self,
        point: FinalizationPoint,
        max_hashes: usize,
    ) -> ProofStorageResult<HeightHashPairRange> {
        let current = self.statistics()?.point;
        if max_hashes == 0 || point > current {
            return Ok(HeightHashPairRange::empty());
        }

        // The upper bound pins the range to what is committed right now.
        let source = self
            .finalized_hashes
            .range(point.to_be_bytes()..=current.to_be_bytes())
            .map(|entry| -> ProofStorageResult<HeightHashPair> {
                let (_, value) = entry?;
                decode_hash_entry(&value)
            });
        Ok(HeightHashPairRange::from_source(source, max_hashes))
    }

    fn load_proof(
        &self,
        point: FinalizationPoint,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>> {
        let Some(bytes) = self.proofs.get(point.to_be_bytes())? else {
            debug!(%point, "no proof at point");
            return Ok(None);
        };

        let packed = PackedFinalizationProof::from_bytes(bytes.to_vec())?;
        if packed.point() != point {
            return Err(ProofStorageError::Corrupted(format!(
                "proof stored under point {} claims point {}",
                point,
                packed.point()
            )));
        }
        Ok(Some(Arc::new(packed)))
    }

    fn load_proof_at_height(
        &self,
        height: Height,
    ) -> ProofStorageResult<Option<Arc<PackedFinalizationProof>>> {
        let Some(bytes) = self.height_index.get(height.to_be_bytes())? else {
            debug!(%height, "no proof at height");
            return Ok(None);
        };

        let point = FinalizationPoint::from_be_bytes(bytes.as_ref().try_into().map_err(|_| {
            ProofStorageError::Corrupted(format!("invalid point bytes for height {height}"))
        })?);
        match self.load_proof(point)? {
            Some(proof) => Ok(Some(proof)),
            None => Err(ProofStorageError::Corrupted(format!(
                "height {height} indexed to missing point {point}"
            ))),
        }
    }

    fn save_proof(
        &mut self,
        height: Height,
        proof: &FinalizationProof,
    ) -> ProofStorageResult<()> {
        let current = self.statistics()?;
        check_proof_advances(&current, height, proof)?;

        let packed = PackedFinalizationProof::pack(proof)?;
        let statistics = bincode::serialize(&FinalizationStatistics::from_proof(proof))?;
        let hash_entry = encode_hash_entry(height, &proof.hash);
        let point_key = proof.point.to_be_bytes();
        let height_key = height.to_be_bytes();

        (
            &self.proofs,
            &self.finalized_hashes,
            &self.height_index,
            &self.metadata,
        )
            .transaction(|(proofs, hashes, heights, metadata)| {
                proofs.insert(&point_key[..], packed.as_bytes())?;
                hashes.insert(&point_key[..], &hash_entry[..])?;
                heights.insert(&height_key[..], &point_key[..])?;
                metadata.insert(META_STATISTICS, statistics.as_slice())?;
                Ok::<_, ConflictableTransactionError<ProofStorageError>>(())
            })?;

        if self.flush_on_save {
            self.db.flush()?;
        }

        info!(point = %proof.point, %height, votes = proof.vote_count(), "proof saved");
        Ok(())
    }
}

fn encode_hash_entry(height: Height, hash: &Hash256) -> [u8; HASH_ENTRY_LEN] {
    let mut entry = [0u8; HASH_ENTRY_LEN];
    entry[..8].copy_from_slice(&height.to_be_bytes());
    entry[8..].copy_from_slice(hash.as_bytes());
    entry
}

fn decode_hash_entry(bytes: &[u8]) -> ProofStorageResult<HeightHashPair> {
    if bytes.len() != HASH_ENTRY_LEN {
        return Err(ProofStorageError::Corrupted(format!(
            "finalized hash entry has {} bytes, expected {}",
            bytes.len(),
            HASH_ENTRY_LEN
        )));
    }
    let mut height = [0u8; 8];
    height.copy_from_slice(&bytes[..8]);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[8..]);
    Ok(HeightHashPair::new(Height::from_be_bytes(height), Hash256(hash)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FinalizationVote;

    // -- Helpers ------------------------------------------------------------

    fn make_proof(point: u64, height: u64) -> FinalizationProof {
        FinalizationProof::new(
            FinalizationPoint(point),
            Height(height),
            Hash256([height as u8; 32]),
        )
        .with_votes(vec![
            FinalizationVote::new([0x01; 32], vec![point as u8; 64]),
            FinalizationVote::new([0x02; 32], vec![height as u8; 64]),
        ])
    }

    fn populated(count: u64) -> SledProofStorage {
        let mut storage = SledProofStorage::open_temporary().unwrap();
        for i in 1..=count {
            storage.save_proof(Height(i * 2), &make_proof(i, i * 2)).unwrap();
        }
        storage
    }

    // -- Tests --------------------------------------------------------------

    #[test]
    fn open_temporary_is_empty() {
        let storage = SledProofStorage::open_temporary().unwrap();
        assert_eq!(storage.proof_count(), 0);
        assert_eq!(
            storage.statistics().unwrap(),
            FinalizationStatistics::default()
        );
    }

    #[test]
    fn save_and_load_by_point_and_height() {
        let storage = populated(3);
        assert_eq!(storage.proof_count(), 3);
        assert_eq!(storage.finalization_point().unwrap(), FinalizationPoint(3));
        assert_eq!(storage.finalized_height().unwrap(), Height(6));

        let by_point = storage.load_proof(FinalizationPoint(2)).unwrap().unwrap();
        assert_eq!(by_point.unpack().unwrap(), make_proof(2, 4));

        let by_height = storage.load_proof_at_height(Height(6)).unwrap().unwrap();
        assert_eq!(by_height.point(), FinalizationPoint(3));
    }

    #[test]
    fn missing_lookups_return_none() {
        let storage = populated(2);
        assert!(storage.load_proof(FinalizationPoint(3)).unwrap().is_none());
        assert!(storage.load_proof_at_height(Height(3)).unwrap().is_none());
    }

    #[test]
    fn stale_proof_is_rejected_without_writing() {
        let mut storage = populated(2);
        let err = storage
            .save_proof(Height(4), &make_proof(2, 4))
            .unwrap_err();
        assert!(matches!(err, ProofStorageError::StalePoint { .. }));
        assert_eq!(storage.proof_count(), 2);
    }

    #[test]
    fn finalized_hashes_are_lazy_and_bounded() {
        let storage = populated(5);

        let pairs: Vec<_> = storage
            .load_finalized_hashes_from(FinalizationPoint(2), 3)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                HeightHashPair::new(Height(4), Hash256([4; 32])),
                HeightHashPair::new(Height(6), Hash256([6; 32])),
                HeightHashPair::new(Height(8), Hash256([8; 32])),
            ]
        );

        assert_eq!(
            storage
                .load_finalized_hashes_from(FinalizationPoint(6), 3)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn range_is_pinned_to_point_at_call_time() {
        let mut storage = populated(2);
        let range = storage
            .load_finalized_hashes_from(FinalizationPoint(1), 10)
            .unwrap();

        storage.save_proof(Height(6), &make_proof(3, 6)).unwrap();

        assert_eq!(range.count(), 2);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut storage = SledProofStorage::open(dir.path()).unwrap();
            storage.save_proof(Height(7), &make_proof(1, 7)).unwrap();
            storage.save_proof(Height(9), &make_proof(2, 9)).unwrap();
        }

        let storage = SledProofStorage::open(dir.path()).unwrap();
        assert_eq!(storage.finalization_point().unwrap(), FinalizationPoint(2));
        assert_eq!(storage.finalized_height().unwrap(), Height(9));
        let proof = storage.load_proof_at_height(Height(7)).unwrap().unwrap();
        assert_eq!(proof.unpack().unwrap(), make_proof(1, 7));
    }

    #[test]
    fn corrupted_hash_entry_is_reported() {
        let storage = populated(1);
        storage
            .finalized_hashes
            .insert(FinalizationPoint(1).to_be_bytes(), &[0u8; 3][..])
            .unwrap();

        let result: Result<Vec<_>, _> = storage
            .load_finalized_hashes_from(FinalizationPoint(1), 1)
            .unwrap()
            .collect();
        assert!(matches!(result, Err(ProofStorageError::Corrupted(_))));
    }

    #[test]
    fn dangling_height_index_is_reported() {
        let storage = populated(1);
        storage
            .height_index
            .insert(Height(100).to_be_bytes(), &FinalizationPoint(50).to_be_bytes()[..])
            .unwrap();

        assert!(matches!(
            storage.load_proof_at_height(Height(100)),
            Err(ProofStorageError::Corrupted(_))
        ));
    }

    #[test]
    fn hash_entry_layout() {
        let entry = encode_hash_entry(Height(0x0102), &Hash256([0xEE; 32]));
        assert_eq!(&entry[..8], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(
            decode_hash_entry(&entry).unwrap(),
            HeightHashPair::new(Height(0x0102), Hash256([0xEE; 32]))
        );
    }
}
