#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Word threshold must be positive")]
    InvalidThreshold,
}

/// Reading the visible document failed
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("No document attached")]
    NoDocument,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
