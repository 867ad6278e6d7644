//! # Data Model
//!
//! Identifiers, proofs, and summaries exchanged between finalization logic,
//! the storage guard, and storage engines.
//!
//! ```text
//! types.rs  — FinalizationPoint, Height, Hash256
//! proof.rs  — FinalizationVote, FinalizationProof, PackedFinalizationProof,
//!             FinalizationStatistics
//! range.rs  — HeightHashPair, HeightHashPairRange
//! ```

pub mod proof;
pub mod range;
pub mod types;

pub use proof::{
    FinalizationProof, FinalizationStatistics, FinalizationVote, PackedFinalizationProof,
};
pub use range::{HeightHashPair, HeightHashPairRange};
pub use types::{FinalizationPoint, Hash256, Height};
