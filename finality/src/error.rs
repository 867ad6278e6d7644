//! # Proof Storage Errors
//!
//! Every failure a storage engine can report. The guard layer in
//! [`crate::cache`] never creates errors of its own; whatever an engine
//! returns reaches the caller untouched.

use sled::transaction::TransactionError;

use crate::model::{FinalizationPoint, Height};

/// Errors reported by proof storage engines.
#[derive(Debug, thiserror::Error)]
pub enum ProofStorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A packed proof carried a format version this build cannot read.
    #[error("unsupported packed proof format version {0}")]
    UnsupportedFormat(u8),

    /// The height passed to `save_proof` disagrees with the proof itself.
    #[error("proof for height {proof_height} cannot be saved at height {height}")]
    HeightMismatch { height: Height, proof_height: Height },

    /// The proof's point does not advance past the last committed point.
    #[error("cannot save proof with point {point}, current point is {current}")]
    StalePoint {
        point: FinalizationPoint,
        current: FinalizationPoint,
    },

    /// The proof's height is below the last finalized height.
    #[error("cannot save proof with height {height}, finalized height is {current}")]
    StaleHeight { height: Height, current: Height },

    /// Indexes and stored proofs disagree with each other.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ProofStorageResult<T> = Result<T, ProofStorageError>;

impl From<bincode::Error> for ProofStorageError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<TransactionError<ProofStorageError>> for ProofStorageError {
    fn from(e: TransactionError<ProofStorageError>) -> Self {
        match e {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => Self::Sled(inner),
        }
    }
}
