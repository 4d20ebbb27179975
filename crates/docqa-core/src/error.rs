use thiserror::Error;

/// Lifecycle errors surfaced to callers of build, save and load.
///
/// Query-time failures never reach this type; the pipeline folds them into a
/// `QueryOutcome` status instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Shape mismatch: {vectors} vectors for {chunks} chunks")]
    ShapeMismatch { vectors: usize, chunks: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Non-finite component in vector {row}")]
    NonFiniteVector { row: usize },

    #[error("Persistence failed while {context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{stage} failed: {message}")]
    Collaborator { stage: &'static str, message: String },
}

impl Error {
    pub fn persistence<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence { context: context.into(), source: Box::new(source) }
    }

    pub fn collaborator(stage: &'static str, err: &anyhow::Error) -> Self {
        Self::Collaborator { stage, message: format!("{err:#}") }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
