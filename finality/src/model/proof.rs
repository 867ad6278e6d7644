//! # Finalization Proofs
//!
//! Two shapes of the same evidence:
//!
//! - [`FinalizationProof`] is what finalization logic builds up while votes
//!   arrive. It is an ordinary owned value and can be edited freely.
//! - [`PackedFinalizationProof`] is what storage hands back to readers. It
//!   is serialized once, never mutated, and shared through an `Arc`, so a
//!   reader can keep it long after its view of the storage is gone.
//!
//! ## Packed Layout
//!
//! ```text
//! ┌──────────────┬─────────────────────────────────┐
//! │ version (1B) │ bincode(FinalizationProof)      │
//! └──────────────┴─────────────────────────────────┘
//! ```
//!
//! The version byte lets a persistent engine refuse data written by a
//! newer build instead of misreading it.

use bincode::Options;
use serde::{Deserialize, Serialize};

use super::types::{FinalizationPoint, Hash256, Height};
use crate::config::{MAX_PACKED_PROOF_BYTES, PACKED_PROOF_FORMAT_VERSION};
use crate::error::{ProofStorageError, ProofStorageResult};

// ---------------------------------------------------------------------------
// FinalizationVote
// ---------------------------------------------------------------------------

/// A single validator's signed vote for a finalized block.
///
/// Signatures are carried as opaque bytes. Checking them belongs to the
/// finalization logic, not to storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationVote {
    /// Public key of the voting validator.
    pub signer: [u8; 32],
    /// Signature over the finalized block hash.
    pub signature: Vec<u8>,
}

impl FinalizationVote {
    pub fn new(signer: [u8; 32], signature: Vec<u8>) -> Self {
        Self { signer, signature }
    }
}

// ---------------------------------------------------------------------------
// FinalizationProof
// ---------------------------------------------------------------------------

/// Evidence that `height` was finalized at `point`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationProof {
    pub point: FinalizationPoint,
    pub height: Height,
    /// Hash of the block finalized at `height`.
    pub hash: Hash256,
    pub votes: Vec<FinalizationVote>,
}

impl FinalizationProof {
    /// Creates a proof with no votes attached yet.
    pub fn new(point: FinalizationPoint, height: Height, hash: Hash256) -> Self {
        Self {
            point,
            height,
            hash,
            votes: Vec::new(),
        }
    }

    /// Builder-style helper that replaces the vote set.
    pub fn with_votes(mut self, votes: Vec<FinalizationVote>) -> Self {
        self.votes = votes;
        self
    }

    pub fn add_vote(&mut self, vote: FinalizationVote) {
        self.votes.push(vote);
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

// ---------------------------------------------------------------------------
// PackedFinalizationProof
// ---------------------------------------------------------------------------

/// Immutable serialized proof, shared between storage and readers.
///
/// Point, height, and hash are kept unpacked next to the bytes so that
/// lookups and hash ranges never pay for a decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedFinalizationProof {
    point: FinalizationPoint,
    height: Height,
    hash: Hash256,
    bytes: Vec<u8>,
}

impl PackedFinalizationProof {
    /// Serializes `proof` into its packed form.
    pub fn pack(proof: &FinalizationProof) -> ProofStorageResult<Self> {
        let encoded = payload_options().serialize(proof)?;
        let mut bytes = Vec::with_capacity(encoded.len() + 1);
        bytes.push(PACKED_PROOF_FORMAT_VERSION);
        bytes.extend_from_slice(&encoded);

        Ok(Self {
            point: proof.point,
            height: proof.height,
            hash: proof.hash,
            bytes,
        })
    }

    /// Rebuilds a packed proof from bytes previously produced by [`pack`].
    ///
    /// The payload is decoded once to validate it and recover the header
    /// fields.
    ///
    /// [`pack`]: PackedFinalizationProof::pack
    pub fn from_bytes(bytes: Vec<u8>) -> ProofStorageResult<Self> {
        let proof = decode(&bytes)?;
        Ok(Self {
            point: proof.point,
            height: proof.height,
            hash: proof.hash,
            bytes,
        })
    }

    /// Decodes back into an editable [`FinalizationProof`].
    pub fn unpack(&self) -> ProofStorageResult<FinalizationProof> {
        decode(&self.bytes)
    }

    pub fn point(&self) -> FinalizationPoint {
        self.point
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// The packed bytes, version byte included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// BLAKE3 digest of the packed bytes. Two packed proofs with the same
    /// digest carry the same votes.
    pub fn digest(&self) -> Hash256 {
        Hash256(*blake3::hash(&self.bytes).as_bytes())
    }
}

fn decode(bytes: &[u8]) -> ProofStorageResult<FinalizationProof> {
    let (version, payload) = bytes
        .split_first()
        .ok_or_else(|| ProofStorageError::Serialization("empty packed proof".to_string()))?;
    if *version != PACKED_PROOF_FORMAT_VERSION {
        return Err(ProofStorageError::UnsupportedFormat(*version));
    }
    Ok(payload_options().deserialize(payload)?)
}

/// Fixed-width bincode, matching `bincode::serialize`, with the payload
/// capped so a damaged length prefix fails instead of allocating.
fn payload_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_PACKED_PROOF_BYTES)
}

// ---------------------------------------------------------------------------
// FinalizationStatistics
// ---------------------------------------------------------------------------

/// Summary of the latest committed proof.
///
/// Empty storage reports point 0, height 0, and the zero hash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationStatistics {
    pub point: FinalizationPoint,
    pub height: Height,
    /// Hash of the block at `height`.
    pub hash: Hash256,
}

impl FinalizationStatistics {
    /// Statistics describing `proof` as the newest committed proof.
    pub fn from_proof(proof: &FinalizationProof) -> Self {
        Self {
            point: proof.point,
            height: proof.height,
            hash: proof.hash,
        }
    }

    /// True until the first proof is committed.
    pub fn is_empty(&self) -> bool {
        self.point == FinalizationPoint::default()
    }
}
