use crate::error::{ScoringError, VectorOwner};
use crate::models::{ItemId, ScoredItem};

use super::vector::{dot, validate};

/// Exact inner-product index over a fixed dimension.
///
/// Built per ranking call; search is a linear scan. Equal scores keep
/// insertion order.
#[derive(Debug, Clone)]
pub struct FlatInnerProductIndex {
    dim: usize,
    ids: Vec<ItemId>,
    vectors: Vec<Vec<f32>>,
}

impl FlatInnerProductIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn add(&mut self, id: ItemId, vector: Vec<f32>) -> Result<(), ScoringError> {
        validate(Some(&vector), VectorOwner::Item(id), Some(self.dim))?;
        self.ids.push(id);
        self.vectors.push(vector);
        Ok(())
    }

    /// The `k` entries with the highest inner product against `query`,
    /// best first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredItem> {
        let mut hits: Vec<ScoredItem> = self
            .ids
            .iter()
            .zip(&self.vectors)
            .map(|(&item_id, vector)| ScoredItem {
                item_id,
                score: dot(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }
}
