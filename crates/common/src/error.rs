//! Error types shared across PagePan crates.

use std::path::PathBuf;

/// Top-level error type for PagePan operations.
#[derive(Debug, thiserror::Error)]
pub enum PagepanError {
    /// Image or viewport dimensions that cannot produce a plan.
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// A crop window fell outside the scaled image. The planner clamps
    /// offsets, so this always points at an internal bug.
    #[error("Crop out of bounds: offset {offset} + height {height} exceeds scaled height {scaled_height}")]
    OutOfBounds {
        offset: u32,
        height: u32,
        scaled_height: u32,
    },

    #[error("No dialogue with a bounding box in {document}")]
    NoDialogue { document: PathBuf },

    #[error("Pan plan has {plan_len} entries but {audio_len} audio clips were found")]
    AlignmentMismatch { plan_len: usize, audio_len: usize },

    /// External encoder failure. `diagnostics` carries the tool's stderr.
    #[error("Encode error: {message}\n{diagnostics}")]
    Encode {
        message: String,
        diagnostics: String,
    },

    #[error("Document error: {message}")]
    Document { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PagepanError.
pub type PagepanResult<T> = Result<T, PagepanError>;

impl PagepanError {
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error means "nothing to render" rather than a failure.
    pub fn is_no_dialogue(&self) -> bool {
        matches!(self, Self::NoDialogue { .. })
    }
}
