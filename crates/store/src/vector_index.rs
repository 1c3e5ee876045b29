//! Vector index abstraction and the exact flat inner-product index.

use crate::error::{StoreError, StoreResult};
use std::cmp::Ordering;

/// One search hit: the ordinal of a stored vector and its inner product with
/// the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: usize,
    pub score: f32,
}

/// Trait for vector index backends.
///
/// Entries are addressed only by ordinal (insertion position). Implementations
/// must support:
/// - Appending a batch of vectors
/// - Exact top-k search by inner product
/// - Reporting size and dimension
/// - Resetting to empty
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored vector must have.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn size(&self) -> usize;

    /// Append vectors contiguously. Rejects the whole batch, without mutation,
    /// if any vector has the wrong dimension.
    fn add(&mut self, vectors: &[Vec<f32>]) -> StoreResult<()>;

    /// Return the `min(k, size)` best entries, scores non-increasing, ties
    /// broken by ascending ordinal.
    fn search(&self, query: &[f32], k: usize) -> StoreResult<Vec<Neighbor>>;

    /// Remove all vectors.
    fn reset(&mut self);
}

/// Brute-force index over a contiguous row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Build an index from a row-major buffer of `count * dimension` values.
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> StoreResult<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: data.len(),
            });
        }
        Ok(Self { dimension, data })
    }

    /// Row-major view of all stored components.
    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    /// Vector stored at `ordinal`.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Drop every vector at or after `len`. Used to roll back an append.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    fn check_dimension(&self, actual: usize) -> StoreResult<()> {
        if actual != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

/// Best-first order: higher score, then lower ordinal.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn size(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.data.len() / self.dimension
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> StoreResult<()> {
        for vector in vectors {
            self.check_dimension(vector.len())?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> StoreResult<Vec<Neighbor>> {
        self.check_dimension(query.len())?;

        let k = k.min(self.size());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, row)| Neighbor {
                ordinal,
                score: row.iter().zip(query).map(|(a, b)| a * b).sum(),
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        Ok(scored)
    }

    fn reset(&mut self) {
        self.data.clear();
    }
}
