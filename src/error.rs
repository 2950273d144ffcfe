//! Error types for the annotation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the annotation pipeline and the exporters.
#[derive(Error, Debug)]
pub enum AnnotateError {
    /// No classifier artifacts exist for the requested identifier
    #[error("Model '{model_id}' not found or incomplete")]
    ModelNotFound {
        /// Identifier that was requested
        model_id: String,
    },

    /// Upload could not be decoded as a raster image
    #[error("Invalid image '{name}': {reason}")]
    InvalidImage {
        /// File name (or placeholder) of the offending upload
        name: String,
        /// Decoder message
        reason: String,
    },

    /// Manual point data is malformed
    #[error("Invalid points payload: {message}")]
    InvalidPointsPayload {
        /// Description of the problem
        message: String,
    },

    /// A count is outside its configured bounds
    #[error("{what} out of range: {value} (allowed {min}..={max})")]
    CountOutOfRange {
        /// What was counted ("points", "images")
        what: &'static str,
        /// Requested value
        value: usize,
        /// Inclusive lower bound
        min: usize,
        /// Inclusive upper bound
        max: usize,
    },

    /// Classifier failed or returned an unusable result
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Configuration could not be loaded
    #[error("Config error in {path:?}: {message}")]
    Config {
        /// Config file path
        path: PathBuf,
        /// Parse or validation message
        message: String,
    },

    /// Label font could not be parsed
    #[error("Font error: {0}")]
    Font(String),

    /// Spreadsheet serialization error
    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// Archive serialization error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Image encoding error
    #[error("Encode error: {0}")]
    Encode(#[from] image::ImageError),

    /// Archive timestamp could not be formatted
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`AnnotateError`] for callers that map errors to
/// responses or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ModelNotFound,
    InvalidImage,
    InvalidPointsPayload,
    CountOutOfRange,
    Classifier,
    Internal,
}

impl AnnotateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            Self::InvalidImage { .. } => ErrorKind::InvalidImage,
            Self::InvalidPointsPayload { .. } => ErrorKind::InvalidPointsPayload,
            Self::CountOutOfRange { .. } => ErrorKind::CountOutOfRange,
            Self::Classifier(_) => ErrorKind::Classifier,
            _ => ErrorKind::Internal,
        }
    }

    /// Whether the caller sent something unusable (as opposed to a failure on our side).
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Classifier | ErrorKind::Internal)
    }

    pub fn model_not_found(model_id: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model_id: model_id.into(),
        }
    }

    pub fn invalid_image(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidImage {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_points(message: impl Into<String>) -> Self {
        Self::InvalidPointsPayload {
            message: message.into(),
        }
    }

    /// Check `value` against an inclusive range.
    pub fn check_count(
        what: &'static str,
        value: usize,
        min: usize,
        max: usize,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(Self::CountOutOfRange {
                what,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
