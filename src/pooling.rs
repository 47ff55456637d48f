//! Embedding reducer: hidden states to one unit-norm vector.
//!
//! The pipeline is masked mean pooling over the sequence axis followed by L2
//! normalization. The hidden size is validated against an optional expected
//! dimension, once at construction against the model's declared size and again on
//! every call against the tensor actually produced.

use tracing::{debug, trace};

use crate::error::EmbedError;
use crate::tensor::Tensor;

/// Reduces `[1, seq_len, hidden_size]` hidden states to a `hidden_size` embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmbeddingReducer {
    expected_dim: Option<usize>,
}

impl EmbeddingReducer {
    /// `Some(0)` is treated the same as `None`: no dimension check.
    pub fn new(expected_dim: Option<usize>) -> Self {
        Self {
            expected_dim: expected_dim.filter(|&d| d > 0),
        }
    }

    pub fn expected_dim(&self) -> Option<usize> {
        self.expected_dim
    }

    /// Check the model's declared hidden size against the expected dimension.
    ///
    /// An unknown declared size passes; the runtime check in [`reduce`](Self::reduce)
    /// still applies.
    pub fn check_declared(&self, declared: Option<usize>) -> Result<(), EmbedError> {
        match (self.expected_dim, declared) {
            (Some(expected), Some(declared)) if expected != declared => {
                Err(EmbedError::Config(format!(
                    "configured embedding dimension {} does not match the model's declared hidden size {}",
                    expected, declared
                )))
            }
            _ => {
                debug!(expected = ?self.expected_dim, ?declared, "Embedding dimension check passed");
                Ok(())
            }
        }
    }

    /// Pool and normalize.
    ///
    /// Fails if the tensor is not `[1, seq_len, hidden_size]` or the hidden size
    /// differs from the expected dimension.
    pub fn reduce(&self, hidden: &Tensor, attention_mask: &[i64]) -> Result<Vec<f32>, EmbedError> {
        let shape = hidden.shape();
        if hidden.rank() != 3 || shape[0] != 1 {
            return Err(EmbedError::ShapeMismatch {
                expected: "[1, seq_len, hidden_size]".to_string(),
                actual: shape.to_vec(),
            });
        }

        let (seq_len, hidden_size) = (shape[1], shape[2]);
        if let Some(expected) = self.expected_dim {
            if expected != hidden_size {
                return Err(EmbedError::DimensionMismatch {
                    expected,
                    actual: hidden_size,
                });
            }
        }

        trace!(seq_len, hidden_size, mask_len = attention_mask.len(), "Reducing hidden states");

        let mut pooled = mean_pool(hidden, attention_mask);
        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

/// Mean of the rows of a `[1, seq_len, hidden_size]` tensor whose mask entry is
/// nonzero.
///
/// Only the first `min(seq_len, mask.len())` positions are visited. With no
/// unmasked position the divisor is 1, which yields the zero vector. A tensor of
/// any other rank has no addressable rows and also pools to zeros.
pub fn mean_pool(hidden: &Tensor, mask: &[i64]) -> Vec<f32> {
    let hidden_size = hidden.shape().last().copied().unwrap_or(0);
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0usize;

    for (pos, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let Some(row) = hidden.row(&[0, pos]) else {
            break;
        };
        for (acc, &v) in sum.iter_mut().zip(row) {
            *acc += v;
        }
        count += 1;
    }

    let divisor = count.max(1) as f32;
    for v in &mut sum {
        *v /= divisor;
    }
    sum
}

/// Scale to unit Euclidean norm in place. A zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}
