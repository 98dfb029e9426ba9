//! Error types for the docproc library.
//!
//! A single enum covers every stage of a request. Variants are grouped by
//! the stage that raises them so the HTTP layer can split client mistakes
//! (400) from processing failures (500) with [`DocProcError::is_client_error`].
//!
//! Processing errors never escape [`crate::process::DocumentProcessor::process`]:
//! they are caught once and turned into a failed
//! [`crate::output::ProcessResponse`] carrying the display message.

use thiserror::Error;

/// All errors produced while handling a document request.
#[derive(Debug, Error)]
pub enum DocProcError {
    // ── Request errors ────────────────────────────────────────────────────
    /// Missing or malformed request fields.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// None of the detection heuristics matched the input.
    #[error("Could not determine file type: {detail}")]
    UnrecognizedFormat { detail: String },

    /// Declared or detected JSON could not be parsed.
    #[error("Invalid JSON document: {detail}")]
    InvalidJson { detail: String },

    /// Base64 payload or image bytes could not be decoded.
    #[error("Failed to decode image: {detail}")]
    ImageDecodeError { detail: String },

    /// PDF bytes could not be decoded or opened, or pdfium is unavailable.
    #[error("Failed to parse PDF: {detail}")]
    PdfParseError { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The LLM call failed, or its output did not satisfy the target schema.
    #[error("LLM analysis failed ({provider}/{model}): {detail}")]
    AnalysisError {
        provider: String,
        model: String,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocProcError {
    /// `true` when the caller sent something we cannot act on at all.
    ///
    /// Only request validation counts: a well-formed request whose document
    /// turns out to be corrupt is still a processing failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DocProcError::InvalidRequest(_))
    }

    /// Short machine-readable name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DocProcError::InvalidRequest(_) => "invalid_request",
            DocProcError::UnrecognizedFormat { .. } => "unrecognized_format",
            DocProcError::InvalidJson { .. } => "invalid_json",
            DocProcError::ImageDecodeError { .. } => "image_decode_error",
            DocProcError::PdfParseError { .. } => "pdf_parse_error",
            DocProcError::AnalysisError { .. } => "analysis_error",
            DocProcError::InvalidConfig(_) => "invalid_config",
            DocProcError::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn analysis(
        provider: impl Into<String>,
        model: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        DocProcError::AnalysisError {
            provider: provider.into(),
            model: model.into(),
            detail: detail.into(),
        }
    }
}

impl From<tokio::task::JoinError> for DocProcError {
    fn from(e: tokio::task::JoinError) -> Self {
        DocProcError::Internal(format!("Blocking task failed: {e}"))
    }
}
