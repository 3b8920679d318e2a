use serde::Deserialize;
use std::path::Path;

use super::vector::{l2_normalize, validate};
use crate::error::{ScoringError, VectorOwner};

#[derive(Debug, Deserialize)]
struct ProjectionWeights {
    weights: Vec<Vec<f32>>,
    #[serde(default)]
    bias: Option<Vec<f32>>,
}

/// Trained linear map `W·x + b` into the shared user/item space.
///
/// `W` has shape `out × in`. Outputs are L2-normalized so that inner product
/// equals cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProjection {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    in_dim: usize,
}

impl LinearProjection {
    pub fn new(weights: Vec<Vec<f32>>, bias: Option<Vec<f32>>) -> Result<Self, ScoringError> {
        let in_dim = weights.first().map(Vec::len).unwrap_or(0);
        if in_dim == 0 {
            return Err(ScoringError::Model("projection has no weights".to_string()));
        }
        if weights.iter().any(|row| row.len() != in_dim) {
            return Err(ScoringError::Model("projection rows differ in length".to_string()));
        }
        if weights.iter().flatten().any(|w| !w.is_finite()) {
            return Err(ScoringError::Model("projection has non-finite weights".to_string()));
        }

        let bias = bias.unwrap_or_else(|| vec![0.0; weights.len()]);
        if bias.len() != weights.len() {
            return Err(ScoringError::Model(format!(
                "bias has {} entries, expected {}",
                bias.len(),
                weights.len()
            )));
        }

        Ok(Self {
            weights,
            bias,
            in_dim,
        })
    }

    /// Parse `{"weights": [[...], ...], "bias": [...]}`; `bias` is optional.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let raw: ProjectionWeights = serde_json::from_str(json)
            .map_err(|e| ScoringError::Model(format!("invalid projection weights: {e}")))?;
        Self::new(raw.weights, raw.bias)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScoringError::Model(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    pub fn out_dim(&self) -> usize {
        self.weights.len()
    }

    /// Project and normalize a raw vector of `in_dim` components.
    pub fn project(&self, vector: &[f32], owner: VectorOwner) -> Result<Vec<f32>, ScoringError> {
        let vector = validate(Some(vector), owner, Some(self.in_dim))?;
        let projected: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(vector).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();
        Ok(l2_normalize(&projected))
    }
}
