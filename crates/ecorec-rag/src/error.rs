use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error(transparent)]
    Core(#[from] ecorec_core::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
