//! Crate-wide error type.
//!
//! Every failure carries an [`ErrorKind`] so the pipeline can decide whether to
//! skip one instrument, abort only the publish step, or stop the whole run.

use thiserror::Error;

/// Failure classes, ordered roughly by how far up they propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing credentials or publish parameters. Aborts the run before any work.
    Config,
    /// Local filesystem failure (creating directories, saving a workbook).
    Io,
    /// Malformed or missing price history for one instrument.
    Data,
    /// Chart generation failure for one instrument.
    Render,
    /// Authentication, network or version-control failure while publishing.
    Publish,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Data => "data",
            ErrorKind::Render => "render",
            ErrorKind::Publish => "publish",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Data, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, message)
    }

    pub fn publish(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Publish, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Config => 2,
            ErrorKind::Io => 3,
            ErrorKind::Data => 4,
            ErrorKind::Render => 5,
            ErrorKind::Publish => 6,
        }
    }
}
