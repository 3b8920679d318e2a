use serde::{Deserialize, Serialize};
use std::path::Path;

use super::vector::{dot, l2_normalize, sigmoid, validate};
use crate::error::{ScoringError, VectorOwner};
use crate::models::{Item, ItemId, ScoredItem};

/// Initial temperature of an untrained scorer
pub const DEFAULT_SCALE: f32 = 2.0;

/// Learned user/item similarity: `sigmoid(scale * cos(u, i))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseScorer {
    scale: f32,
}

impl Default for PairwiseScorer {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
        }
    }
}

impl PairwiseScorer {
    pub fn new(scale: f32) -> Result<Self, ScoringError> {
        if !scale.is_finite() {
            return Err(ScoringError::Model(format!("scale must be finite, got {scale}")));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Parse weights from `{"scale": 2.0}`.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let scorer: Self = serde_json::from_str(json)
            .map_err(|e| ScoringError::Model(format!("invalid scorer weights: {e}")))?;
        Self::new(scorer.scale)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScoringError::Model(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Score two unit vectors.
    pub fn score(&self, user: &[f32], item: &[f32]) -> f32 {
        sigmoid(self.scale * dot(user, item))
    }

    /// Score every candidate and keep the best `top_n`.
    ///
    /// All or nothing: one malformed item vector fails the whole call.
    pub fn rank(
        &self,
        candidates: &[Item],
        user_vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<ItemId>, ScoringError> {
        let user = validate(Some(user_vector), VectorOwner::User, None)?;
        let dimension = user.len();
        let user = l2_normalize(user);

        let mut scored = candidates
            .iter()
            .map(|item| {
                let embedding = validate(
                    item.embedding.as_deref(),
                    VectorOwner::Item(item.id),
                    Some(dimension),
                )?;
                Ok(ScoredItem {
                    item_id: item.id,
                    score: self.score(&user, &l2_normalize(embedding)),
                })
            })
            .collect::<Result<Vec<_>, ScoringError>>()?;

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored.into_iter().take(top_n).map(|s| s.item_id).collect())
    }
}
