//! Embedding pipeline: text → dense vector embedding.
//!
//! [`Embedder`] ties a [`SequenceEncoder`], an [`InferenceEngine`] and an
//! [`EmbeddingReducer`] together behind a simple `embed(text) -> Vec<f32>` API.
//!
//! The pipeline: encode → forward pass → masked mean pool → L2 normalize.
//! Batches run item by item on a rayon pool; output order always matches input order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::InferenceEngine;
use crate::error::EmbedError;
use crate::pooling::EmbeddingReducer;
use crate::tokenizer::{Encoding, SequenceEncoder};

/// Settings for an [`Embedder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedderConfig {
    /// Expected embedding dimension. `None` or `Some(0)` disables the check.
    pub expected_dim: Option<usize>,
    /// Worker threads for batch calls. 0 uses rayon's global pool.
    pub num_threads: usize,
}

impl EmbedderConfig {
    pub fn with_expected_dim(mut self, dim: usize) -> Self {
        self.expected_dim = Some(dim);
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }
}

/// Cooperative cancellation flag for batch calls.
///
/// Clones share the same flag. Checked before each batch item starts; an item
/// already running is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Text to L2-normalized embedding.
///
/// Thread-safe: every component is immutable after construction, so one
/// `Embedder` can be shared across threads via `Arc<Embedder>`.
pub struct Embedder {
    encoder: Arc<dyn SequenceEncoder>,
    engine: Arc<dyn InferenceEngine>,
    reducer: EmbeddingReducer,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("max_length", &self.encoder.max_length())
            .field("reducer", &self.reducer)
            .field("dedicated_pool", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

impl Embedder {
    /// Build the pipeline. Fails if the model's declared hidden size conflicts
    /// with `config.expected_dim`, or the worker pool cannot be created.
    pub fn new(
        encoder: Arc<dyn SequenceEncoder>,
        engine: Arc<dyn InferenceEngine>,
        config: EmbedderConfig,
    ) -> Result<Self, EmbedError> {
        let reducer = EmbeddingReducer::new(config.expected_dim);
        let declared = engine.declared_hidden_size();
        reducer.check_declared(declared)?;

        let pool = if config.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .build()
                .map_err(|e| EmbedError::Config(format!("failed to build worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        info!(
            max_length = encoder.max_length(),
            vocab_size = encoder.vocabulary().len(),
            expected_dim = ?reducer.expected_dim(),
            declared_dim = ?declared,
            num_threads = config.num_threads,
            "Embedder loaded"
        );

        Ok(Self {
            encoder,
            engine,
            reducer,
            pool,
        })
    }

    /// Embed one text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let encoding = self.encoder.encode(text)?;
        self.embed_encoding(&encoding)
    }

    /// Embed a text pair. Fails if the encoder has no pair mode or `text_b` is `None`.
    pub fn embed_pair(&self, text_a: &str, text_b: Option<&str>) -> Result<Vec<f32>, EmbedError> {
        let encoding = self.encoder.encode_pair(text_a, text_b)?;
        self.embed_encoding(&encoding)
    }

    /// Run inference on an existing encoding and reduce the result.
    pub fn embed_encoding(&self, encoding: &Encoding) -> Result<Vec<f32>, EmbedError> {
        let outputs = self
            .engine
            .run(&encoding.input_ids, &encoding.attention_mask)?;
        let hidden = outputs.hidden_state()?;
        debug!(
            sequence_length = encoding.sequence_length,
            shape = ?hidden.shape(),
            "Forward pass complete"
        );
        self.reducer.reduce(hidden, &encoding.attention_mask)
    }

    /// Embed a batch in parallel. The first failure fails the whole batch.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.install(|| texts.par_iter().map(|text| self.embed(text)).collect())
    }

    /// Embed a batch in parallel, reporting success or failure per item.
    ///
    /// Items that have not started when `cancel` fires report
    /// [`EmbedError::Cancelled`].
    pub fn embed_batch_each(
        &self,
        texts: &[&str],
        cancel: Option<&CancellationToken>,
    ) -> Vec<Result<Vec<f32>, EmbedError>> {
        self.install(|| {
            texts
                .par_iter()
                .enumerate()
                .map(|(index, text)| {
                    if cancel.is_some_and(CancellationToken::is_cancelled) {
                        return Err(EmbedError::Cancelled);
                    }
                    let result = self.embed(text);
                    if let Err(e) = &result {
                        warn!(index, error = %e, "Embedding failed for batch item");
                    }
                    result
                })
                .collect()
        })
    }

    /// Configured or declared embedding dimension, whichever is known.
    pub fn embedding_dim(&self) -> Option<usize> {
        self.reducer
            .expected_dim()
            .or_else(|| self.engine.declared_hidden_size())
    }

    pub fn encoder(&self) -> &dyn SequenceEncoder {
        self.encoder.as_ref()
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
