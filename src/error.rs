use std::path::{Path, PathBuf};

/// Request-level failures. A missed match is not one of these; it is the
/// `no_match` outcome of a lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Could not load data file at {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("Missing required column: {column}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{0}")]
    InvalidQuery(String),
}

impl LookupError {
    pub fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(path: impl Into<PathBuf>, column: &str) -> Self {
        Self::MissingColumn {
            path: path.into(),
            column: column.to_string(),
        }
    }

    /// The data file a load failure refers to.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::DataLoad { path, .. } | Self::MissingColumn { path, .. } => Some(path),
            Self::InvalidQuery(_) => None,
        }
    }
}

/// Failures of the text-generation collaborator. These never fail a request;
/// they are rendered into the analysis field instead.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("no API key configured (set GROQ_API_KEY or pass --api-key)")]
    NotConfigured,

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API returned an empty completion")]
    EmptyCompletion,
}
