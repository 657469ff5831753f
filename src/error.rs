use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read PDF {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("document is encrypted")]
    Encrypted,
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for LayoutError {
    fn from(err: lopdf::Error) -> Self {
        LayoutError::Parse(err.to_string())
    }
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;
