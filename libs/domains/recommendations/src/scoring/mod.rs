//! Candidate ranking.
//!
//! [`ScoringEngine::rank`] picks a [`RankingStrategy`] per call: the
//! popularity fallback when the user has no preference vector, otherwise the
//! configured personalized strategy. The two personalized strategies differ
//! in fault tolerance. Pairwise scoring fails the whole call on a single
//! malformed item vector; projected index search skips that item and ranks
//! the rest.

mod index;
mod pairwise;
mod projection;
pub mod vector;

pub use index::FlatInnerProductIndex;
pub use pairwise::{PairwiseScorer, DEFAULT_SCALE};
pub use projection::LinearProjection;

use std::cmp::Reverse;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::{ScoringError, VectorOwner};
use crate::models::{Item, ItemId};

/// Configurable personalized strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StrategyKind {
    #[default]
    Pairwise,
    Index,
}

#[derive(Debug, Clone)]
pub enum RankingStrategy {
    /// Static popularity, descending, stable
    PopularityFallback,
    PairwiseScorer(PairwiseScorer),
    ProjectedIndexSearch(LinearProjection),
}

impl RankingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            RankingStrategy::PopularityFallback => "popularity_fallback",
            RankingStrategy::PairwiseScorer(_) => "pairwise",
            RankingStrategy::ProjectedIndexSearch(_) => "projected_index_search",
        }
    }

    /// Rank `candidates` and return at most `top_n` ids.
    ///
    /// The popularity fallback ignores `user_vector`; the personalized
    /// strategies require it.
    pub fn rank(
        &self,
        candidates: &[Item],
        user_vector: Option<&[f32]>,
        top_n: usize,
    ) -> Result<Vec<ItemId>, ScoringError> {
        match self {
            RankingStrategy::PopularityFallback => Ok(popularity_rank(candidates, top_n)),
            RankingStrategy::PairwiseScorer(scorer) => {
                let user = user_vector.ok_or(ScoringError::MissingVector(VectorOwner::User))?;
                scorer.rank(candidates, user, top_n)
            }
            RankingStrategy::ProjectedIndexSearch(projection) => {
                let user = user_vector.ok_or(ScoringError::MissingVector(VectorOwner::User))?;
                index_rank(projection, candidates, user, top_n)
            }
        }
    }
}

fn popularity_rank(candidates: &[Item], top_n: usize) -> Vec<ItemId> {
    let mut ranked: Vec<&Item> = candidates.iter().collect();
    ranked.sort_by_key(|item| Reverse(item.popularity));
    ranked.into_iter().take(top_n).map(|item| item.id).collect()
}

fn index_rank(
    projection: &LinearProjection,
    candidates: &[Item],
    user_vector: &[f32],
    top_n: usize,
) -> Result<Vec<ItemId>, ScoringError> {
    let user = projection.project(user_vector, VectorOwner::User)?;
    let mut index = FlatInnerProductIndex::new(projection.out_dim());

    for item in candidates {
        match project_item(projection, item).and_then(|v| index.add(item.id, v)) {
            Ok(()) => {}
            Err(e) => warn!(item_id = item.id, error = %e, "Skipping item with malformed vector"),
        }
    }

    debug!(indexed = index.len(), candidates = candidates.len(), "Index built");
    Ok(index
        .search(&user, top_n)
        .into_iter()
        .map(|hit| hit.item_id)
        .collect())
}

/// Pre-projected vectors are used as is; raw embeddings go through the
/// projection.
fn project_item(projection: &LinearProjection, item: &Item) -> Result<Vec<f32>, ScoringError> {
    let owner = VectorOwner::Item(item.id);
    match item.projected_embedding.as_deref() {
        Some(projected) => {
            let projected = vector::validate(Some(projected), owner, Some(projection.out_dim()))?;
            Ok(vector::l2_normalize(projected))
        }
        None => {
            let raw = vector::validate(item.embedding.as_deref(), owner, None)?;
            projection.project(raw, owner)
        }
    }
}

/// Selects a strategy per call and runs it.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    personalized: RankingStrategy,
}

impl ScoringEngine {
    /// `personalized` ranks users that have a preference vector.
    pub fn new(personalized: RankingStrategy) -> Self {
        Self { personalized }
    }

    pub fn personalized(&self) -> &RankingStrategy {
        &self.personalized
    }

    pub fn strategy_for(&self, user_vector: Option<&[f32]>) -> &RankingStrategy {
        match user_vector {
            Some(_) => &self.personalized,
            None => &RankingStrategy::PopularityFallback,
        }
    }

    pub fn rank(
        &self,
        candidates: &[Item],
        user_vector: Option<&[f32]>,
        top_n: usize,
    ) -> Result<Vec<ItemId>, ScoringError> {
        let strategy = self.strategy_for(user_vector);
        debug!(
            strategy = strategy.name(),
            candidates = candidates.len(),
            top_n,
            "Ranking candidates"
        );
        strategy.rank(candidates, user_vector, top_n)
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(RankingStrategy::PairwiseScorer(PairwiseScorer::default()))
    }
}
