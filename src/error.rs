//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use thiserror::Error;

/// Main error type for prgmap operations
#[derive(Error, Debug)]
pub enum PrgmapError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A PRG byte that is neither a DNA character nor a marker digit
    #[error("invalid PRG encoding at byte {offset}: {byte:#04x}")]
    InvalidEncoding { offset: usize, byte: u8 },

    /// Structurally invalid PRG (unpaired site markers, mask inconsistency)
    #[error("malformed PRG: {message}")]
    MalformedPrg { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Parse errors in persisted index files or read files
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Internal invariant violations
    #[error("internal invariant violated: {message}")]
    InternalInvariant { message: String },
}

/// Type alias for Results using PrgmapError
pub type Result<T> = std::result::Result<T, PrgmapError>;

impl From<serde_json::Error> for PrgmapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

impl PrgmapError {
    /// Create a malformed-PRG error
    pub fn malformed_prg(message: impl Into<String>) -> Self {
        Self::MalformedPrg {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an internal invariant error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InternalInvariant {
            message: message.into(),
        }
    }

    /// Process exit code for this error kind.
    ///
    /// `2` invalid arguments, `3` I/O or parse failure, `4` internal
    /// invariant violation.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Io(_)
            | Self::InvalidEncoding { .. }
            | Self::MalformedPrg { .. }
            | Self::Parse { .. } => 3,
            Self::InternalInvariant { .. } => 4,
        }
    }
}
