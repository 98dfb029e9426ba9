//! Content extraction: dispatch on the detected type and normalize.

use crate::document::NormalizedDocument;
use crate::error::DocProcError;
use crate::pipeline::{image, pdf};
use crate::request::{DocumentData, DocumentType};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Parse `data` as `doc_type`.
///
/// `pdfium_lib_path` is only consulted on the PDF path.
pub async fn extract(
    data: DocumentData,
    doc_type: DocumentType,
    pdfium_lib_path: Option<&Path>,
) -> Result<NormalizedDocument, DocProcError> {
    let doc = match (doc_type, data) {
        (DocumentType::Json, data) => NormalizedDocument::Json(parse_json(data)?),

        (DocumentType::Image, DocumentData::Text(text)) => {
            NormalizedDocument::Image(image::extract_image(&text).await?)
        }
        (DocumentType::Image, DocumentData::Bytes(bytes)) => {
            NormalizedDocument::Image(image::extract_image_bytes(bytes).await?)
        }

        (DocumentType::Pdf, DocumentData::Text(text)) => {
            NormalizedDocument::Pdf(pdf::extract_pdf(&text, pdfium_lib_path).await?)
        }
        (DocumentType::Pdf, DocumentData::Bytes(bytes)) => {
            NormalizedDocument::Pdf(pdf::extract_pdf_bytes(bytes, pdfium_lib_path).await?)
        }

        (DocumentType::Image, DocumentData::Structured(_)) => {
            return Err(DocProcError::ImageDecodeError {
                detail: "a JSON value cannot be decoded as an image".into(),
            })
        }
        (DocumentType::Pdf, DocumentData::Structured(_)) => {
            return Err(DocProcError::PdfParseError {
                detail: "a JSON value cannot be parsed as a PDF".into(),
            })
        }
    };
    debug!(document_type = %doc.document_type(), "Document extracted");
    Ok(doc)
}

fn parse_json(data: DocumentData) -> Result<Value, DocProcError> {
    match data {
        DocumentData::Structured(value) => Ok(value),
        DocumentData::Text(text) => {
            serde_json::from_str(&text).map_err(|e| DocProcError::InvalidJson {
                detail: e.to_string(),
            })
        }
        DocumentData::Bytes(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| DocProcError::InvalidJson {
                detail: e.to_string(),
            })
        }
    }
}
