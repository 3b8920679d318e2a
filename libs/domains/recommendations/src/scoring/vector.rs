use crate::error::{ScoringError, VectorOwner};

/// Lower bound on the norm used by [`l2_normalize`]
pub const NORM_EPSILON: f32 = 1e-12;

/// Check that a vector is present, non-empty, finite and, when `expected`
/// is given, of that dimension.
pub fn validate(
    vector: Option<&[f32]>,
    owner: VectorOwner,
    expected: Option<usize>,
) -> Result<&[f32], ScoringError> {
    let vector = vector.ok_or(ScoringError::MissingVector(owner))?;

    if vector.is_empty() {
        return Err(ScoringError::Malformed {
            owner,
            reason: "empty vector".to_string(),
        });
    }
    if let Some(position) = vector.iter().position(|x| !x.is_finite()) {
        return Err(ScoringError::Malformed {
            owner,
            reason: format!("non-finite component at {position}"),
        });
    }
    match expected {
        Some(expected) if vector.len() != expected => Err(ScoringError::DimensionMismatch {
            owner,
            expected,
            actual: vector.len(),
        }),
        _ => Ok(vector),
    }
}

/// Scale to unit length; a zero vector stays zero.
pub fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm = dot(vector, vector).sqrt().max(NORM_EPSILON);
    vector.iter().map(|x| x / norm).collect()
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Elementwise arithmetic mean. `None` for an empty set or mixed dimensions.
pub fn mean<'a>(vectors: impl IntoIterator<Item = &'a [f32]>) -> Option<Vec<f32>> {
    let mut vectors = vectors.into_iter();
    let mut sum = vectors.next()?.to_vec();
    let mut count = 1usize;

    for vector in vectors {
        if vector.len() != sum.len() {
            return None;
        }
        for (acc, x) in sum.iter_mut().zip(vector) {
            *acc += x;
        }
        count += 1;
    }

    let count = count as f32;
    sum.iter_mut().for_each(|x| *x /= count);
    Some(sum)
}
