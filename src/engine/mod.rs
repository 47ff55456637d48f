//! High-level embedding APIs.
//!
//! - [`InferenceEngine`]: the transformer collaborator, `input_ids` → hidden states
//! - [`Embedder`]: text → dense, unit-norm vector embedding

pub mod embed;

pub use embed::{CancellationToken, Embedder, EmbedderConfig};

use crate::error::EmbedError;
use crate::tensor::Tensor;

/// Name of the output carrying per-token hidden states.
pub const LAST_HIDDEN_STATE: &str = "last_hidden_state";

/// A transformer encoder that produces per-token hidden states.
///
/// Inputs are shaped `[1, seq_len]`; implementations return at least one output,
/// normally named [`LAST_HIDDEN_STATE`] and shaped `[1, seq_len, hidden_size]`.
/// Calls are blocking. Implementations must tolerate concurrent `run` calls.
pub trait InferenceEngine: Send + Sync {
    /// Hidden size from model metadata, if the model declares one.
    fn declared_hidden_size(&self) -> Option<usize> {
        None
    }

    fn run(&self, input_ids: &[i64], attention_mask: &[i64]) -> Result<ModelOutputs, EmbedError>;
}

/// Named output tensors in model output order.
#[derive(Debug, Clone, Default)]
pub struct ModelOutputs {
    outputs: Vec<(String, Tensor)>,
}

impl ModelOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-output convenience constructor.
    pub fn hidden(tensor: Tensor) -> Self {
        Self::new().with_output(LAST_HIDDEN_STATE, tensor)
    }

    pub fn with_output(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.outputs.push((name.into(), tensor));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// The `last_hidden_state` output, or the first output when no output has that name.
    pub fn hidden_state(&self) -> Result<&Tensor, EmbedError> {
        self.get(LAST_HIDDEN_STATE)
            .or_else(|| self.outputs.first().map(|(_, t)| t))
            .ok_or_else(|| EmbedError::Inference("model produced no outputs".to_string()))
    }
}
