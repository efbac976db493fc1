use thiserror::Error;

/// Failures that reach the caller. Backend outages and low-confidence
/// detections are recovered inside the pipeline and never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDocument(message.into())
    }

    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidDocument(_))
    }
}
