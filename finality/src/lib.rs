// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NOVA Finality — Finalization Proof Storage
//!
//! Finalization proofs are the evidence that a height became irreversible:
//! the votes of 2/3 + 1 of the validator set for a block hash at a given
//! finalization point. Consensus writes them, sync and RPC handlers read
//! them, and all of that happens at once. This crate is where those two
//! sides meet.
//!
//! ## Architecture
//!
//! - **cache** — `ProofStorageCache`, the single owner of the storage
//!   engine. Hands out `ProofStorageView` (many at once, read-only) and
//!   `ProofStorageModifier` (one at a time, exclusive).
//! - **storage** — The `ProofStorage` engine trait with an in-memory and a
//!   sled-backed implementation.
//! - **model** — Points, heights, proofs, packed proofs, statistics, and
//!   finalized hash ranges.
//! - **config** — Storage constants and `ProofStorageConfig`.
//! - **logging** — Optional `tracing` subscriber setup.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use nova_finality::cache::ProofStorageCache;
//! use nova_finality::model::{FinalizationPoint, FinalizationProof, Hash256, Height};
//! use nova_finality::storage::MemoryProofStorage;
//!
//! let cache = Arc::new(ProofStorageCache::new(MemoryProofStorage::new()));
//!
//! let proof = FinalizationProof::new(FinalizationPoint(1), Height(1), Hash256([7; 32]));
//! cache.modifier().save_proof(Height(1), &proof).unwrap();
//!
//! let view = cache.view();
//! assert_eq!(view.finalized_height().unwrap(), Height(1));
//! let packed = view.load_proof_at_height(Height(1)).unwrap().unwrap();
//! assert_eq!(packed.unpack().unwrap(), proof);
//! ```
//!
//! ## Ground Rules
//!
//! 1. Only committed state is ever visible. Readers never see half a save.
//! 2. Points only move forward. Nothing committed is ever rewritten.
//! 3. Whatever a reader gets back is its own. Proofs are `Arc`-shared and
//!    immutable, and outlive the view that loaded them.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;

pub use cache::{ProofStorageCache, ProofStorageModifier, ProofStorageView};
pub use config::{ProofStorageConfig, StorageBackend};
pub use error::{ProofStorageError, ProofStorageResult};
pub use storage::{MemoryProofStorage, ProofStorage, SledProofStorage};
