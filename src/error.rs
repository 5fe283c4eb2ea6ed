use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a transcript collaborator.
#[derive(Debug, Error)]
#[error("transcript {operation} failed: {source}")]
pub struct TranscriptError {
    pub operation: &'static str,
    #[source]
    pub source: BoxError,
}

impl TranscriptError {
    pub fn new(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error("input closed while waiting for {label:?}")]
    InputClosed { label: String },

    #[error("editor failed: {0}")]
    Editor(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("failed to serialize edit document: {0}")]
    EditSerialize(#[source] toml::ser::Error),
}

impl CommandError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
