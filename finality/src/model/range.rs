//! Lazily produced sequences of finalized `(height, hash)` pairs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{Hash256, Height};
use crate::error::ProofStorageResult;

/// Identity of one finalized block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightHashPair {
    pub height: Height,
    pub hash: Hash256,
}

impl HeightHashPair {
    pub fn new(height: Height, hash: Hash256) -> Self {
        Self { height, hash }
    }
}

type PairSource = Box<dyn Iterator<Item = ProofStorageResult<HeightHashPair>> + Send>;

/// Ordered, finite, single-pass sequence of [`HeightHashPair`]s.
///
/// The range owns whatever it reads from, so it stays usable after the
/// view that produced it has been dropped and can be handed to another
/// thread. It yields at most the `limit`
/// it was built with. Once exhausted it stays exhausted; asking storage
/// again produces a fresh range over the then-current data.
pub struct HeightHashPairRange {
    source: PairSource,
    remaining: usize,
}

impl HeightHashPairRange {
    /// A range that yields nothing.
    pub fn empty() -> Self {
        Self {
            source: Box::new(std::iter::empty()),
            remaining: 0,
        }
    }

    /// Wraps an arbitrary owned source, yielding at most `limit` items.
    pub fn from_source<I>(source: I, limit: usize) -> Self
    where
        I: Iterator<Item = ProofStorageResult<HeightHashPair>> + Send + 'static,
    {
        Self {
            source: Box::new(source),
            remaining: limit,
        }
    }

    /// Upper bound on the number of items still to come.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for HeightHashPairRange {
    type Item = ProofStorageResult<HeightHashPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.source.next() {
            Some(item) => {
                self.remaining -= 1;
                Some(item)
            }
            None => {
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.source.size_hint();
        let upper = upper.map_or(self.remaining, |u| u.min(self.remaining));
        (0, Some(upper))
    }
}

impl fmt::Debug for HeightHashPairRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeightHashPairRange")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
