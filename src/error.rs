use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Special token {role} ('{token}') is not in the vocabulary")]
    MissingSpecialToken { role: &'static str, token: String },

    #[error("max_length must be at least 2 to fit the boundary tokens, got {0}")]
    MaxLengthTooSmall(usize),

    #[error("Shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        expected: String,
        actual: Vec<usize>,
    },

    #[error("Embedding dimension mismatch: configured {expected}, model produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl EmbedError {
    /// Whether this error comes from construction-time configuration rather
    /// than from a single call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EmbedError::Config(_)
                | EmbedError::MissingSpecialToken { .. }
                | EmbedError::MaxLengthTooSmall(_)
                | EmbedError::Io(_)
                | EmbedError::Json(_)
        )
    }
}
