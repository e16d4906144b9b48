//! Shape handling for feature-extraction responses.
//!
//! Hosted feature-extraction endpoints answer with one of several shapes
//! depending on the model and on whether one or many inputs were sent:
//!
//! - `[f32; D]`: one sentence vector
//! - `[[f32; D]; N]`: one sentence vector per input
//! - `[[f32; D]; T]`: token vectors for a single input
//! - `[[[f32; D]; T]; N]`: token vectors per input
//!
//! The two middle shapes are indistinguishable by type alone, so the number
//! of inputs decides which one was meant.

use sage_core::{AppError, AppResult};
use serde::Deserialize;

/// Raw response body of a feature-extraction call.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeatureOutput {
    Flat(Vec<f32>),
    Matrix(Vec<Vec<f32>>),
    Tensor(Vec<Vec<Vec<f32>>>),
}

impl FeatureOutput {
    /// Resolve the response into one sentence vector per input.
    pub fn into_sentence_vectors(self, inputs: usize) -> AppResult<Vec<Vec<f32>>> {
        let vectors = match self {
            FeatureOutput::Flat(vector) => vec![vector],
            FeatureOutput::Matrix(rows) if inputs == rows.len() => rows,
            FeatureOutput::Matrix(tokens) if inputs == 1 => vec![mean_pool(&tokens)?],
            FeatureOutput::Matrix(rows) => {
                return Err(AppError::Backend(format!(
                    "Embedding response has {} rows for {} inputs",
                    rows.len(),
                    inputs
                )))
            }
            FeatureOutput::Tensor(per_input) => per_input
                .iter()
                .map(|tokens| mean_pool(tokens))
                .collect::<AppResult<_>>()?,
        };

        if vectors.len() != inputs {
            return Err(AppError::Backend(format!(
                "Embedding response has {} vectors for {} inputs",
                vectors.len(),
                inputs
            )));
        }

        Ok(vectors)
    }
}

/// Average token vectors across the token axis.
pub fn mean_pool(tokens: &[Vec<f32>]) -> AppResult<Vec<f32>> {
    let hidden_size = tokens
        .first()
        .map(|t| t.len())
        .ok_or_else(|| AppError::Backend("Embedding response has no tokens".to_string()))?;

    let mut result = vec![0.0f32; hidden_size];
    for token in tokens {
        if token.len() != hidden_size {
            return Err(AppError::Backend(format!(
                "Ragged token vectors: {} vs {}",
                token.len(),
                hidden_size
            )));
        }
        for (acc, v) in result.iter_mut().zip(token) {
            *acc += v;
        }
    }

    let count = tokens.len() as f32;
    for v in &mut result {
        *v /= count;
    }

    Ok(result)
}

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
