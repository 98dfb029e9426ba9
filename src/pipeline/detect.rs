//! Document type detection.
//!
//! An explicit ordered predicate chain. Order matters: a data URL is
//! checked before the brace test, and the base64 probe runs last because
//! almost any short alphanumeric string is valid base64.
//!
//! Undecodable-but-valid base64 without a PDF signature is classified as an
//! image. That is a guess, not a sniff: a corrupt image and arbitrary binary
//! data look the same here, and the image decoder reports the failure.

use crate::error::DocProcError;
use crate::pipeline::decode::{self, has_pdf_signature, IMAGE_DATA_URL, PDF_DATA_URL, PDF_MAGIC};
use crate::request::{DocumentData, DocumentType};
use tracing::debug;

/// Outcome of running the heuristics, before it becomes an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Json,
    Image,
    Pdf,
    Unrecognized,
}

impl Detection {
    fn into_type(self) -> Option<DocumentType> {
        match self {
            Detection::Json => Some(DocumentType::Json),
            Detection::Image => Some(DocumentType::Image),
            Detection::Pdf => Some(DocumentType::Pdf),
            Detection::Unrecognized => None,
        }
    }
}

/// Decide the document type, trusting `declared` when present.
pub fn detect(
    data: &DocumentData,
    declared: Option<DocumentType>,
) -> Result<DocumentType, DocProcError> {
    if let Some(t) = declared {
        debug!(document_type = %t, "Using declared document type");
        return Ok(t);
    }
    let detection = classify(data);
    debug!(?detection, "Detected document type");
    detection
        .into_type()
        .ok_or_else(|| DocProcError::UnrecognizedFormat {
            detail: "payload is not JSON, a data URL, or base64".into(),
        })
}

/// Run the heuristic chain without a declared type.
pub fn classify(data: &DocumentData) -> Detection {
    match data {
        DocumentData::Structured(_) => Detection::Json,
        DocumentData::Text(text) => classify_text(text),
        DocumentData::Bytes(bytes) => classify_bytes(bytes),
    }
}

fn classify_text(text: &str) -> Detection {
    if text.starts_with(IMAGE_DATA_URL) {
        return Detection::Image;
    }
    if text.starts_with(PDF_DATA_URL) {
        return Detection::Pdf;
    }
    if looks_like_json(text) {
        return Detection::Json;
    }
    match decode::decode_base64(text) {
        Ok(bytes) if has_pdf_signature(&bytes) => Detection::Pdf,
        Ok(_) => Detection::Image,
        Err(_) => Detection::Unrecognized,
    }
}

fn classify_bytes(bytes: &[u8]) -> Detection {
    if bytes.starts_with(PDF_MAGIC) {
        Detection::Pdf
    } else {
        Detection::Image
    }
}

/// `true` when `text`, trimmed, is wrapped in `{…}` or `[…]`.
pub fn looks_like_json(text: &str) -> bool {
    let t = text.trim();
    (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}
