pub mod error;
pub mod vocab;
pub mod tokenizer;
pub mod tensor;
pub mod pooling;
pub mod engine;
pub mod cli;

pub use error::EmbedError;
pub use vocab::Vocabulary;
pub use tokenizer::{
    BpeEncoder, Encoding, SequenceEncoder, SubwordSplitter, TokenizerConfig, WordPieceEncoder,
};
pub use tensor::Tensor;
pub use pooling::EmbeddingReducer;
pub use engine::{CancellationToken, Embedder, EmbedderConfig, InferenceEngine, ModelOutputs};
