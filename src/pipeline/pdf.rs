//! PDF extraction: base64 payload → [`PdfDocument`] via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Text extraction runs on the blocking pool so a large document cannot
//! stall the runtime worker that is serving other requests.
//!
//! ## Library binding
//!
//! pdfium is linked dynamically. A missing library is reported as a
//! [`DocProcError::PdfParseError`] for the request rather than a panic, so
//! JSON and image requests keep working on hosts without pdfium.

use crate::document::{PdfDocument, PdfPage};
use crate::error::DocProcError;
use crate::pipeline::decode;
use pdfium_render::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Decode a base64 / data-URL PDF payload and extract its text.
pub async fn extract_pdf(
    payload: &str,
    lib_path: Option<&Path>,
) -> Result<PdfDocument, DocProcError> {
    let bytes = decode::decode_payload(payload).map_err(|e| DocProcError::PdfParseError {
        detail: format!("invalid base64: {e}"),
    })?;
    extract_pdf_bytes(bytes, lib_path).await
}

/// Extract text and metadata from raw PDF bytes.
pub async fn extract_pdf_bytes(
    bytes: Vec<u8>,
    lib_path: Option<&Path>,
) -> Result<PdfDocument, DocProcError> {
    if !decode::has_pdf_signature(&bytes) {
        return Err(DocProcError::PdfParseError {
            detail: format!(
                "missing %PDF header (first bytes: {:?})",
                &bytes[..bytes.len().min(4)]
            ),
        });
    }
    let lib_path = lib_path.map(Path::to_path_buf);
    tokio::task::spawn_blocking(move || extract_pdf_blocking(&bytes, lib_path.as_deref())).await?
}

/// Bind to the pdfium shared library.
///
/// Search order: explicit path, working directory, system library path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, DocProcError> {
    let explicit: Option<PathBuf> = lib_path.map(|p| {
        if p.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(p)
        } else {
            p.to_path_buf()
        }
    });

    let bindings = match explicit {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| DocProcError::PdfParseError {
        detail: format!("pdfium library unavailable (set PDFIUM_LIB_PATH): {:?}", e),
    })?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of PDF text extraction.
fn extract_pdf_blocking(
    bytes: &[u8],
    lib_path: Option<&Path>,
) -> Result<PdfDocument, DocProcError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            DocProcError::PdfParseError {
                detail: "document is encrypted and requires a password".into(),
            }
        } else {
            DocProcError::PdfParseError { detail: err_str }
        }
    })?;

    let metadata = read_metadata(&document);
    let pages = document.pages();
    let page_count = pages.len() as usize;
    if page_count == 0 {
        warn!("PDF has no pages");
    } else {
        info!("PDF loaded: {} pages", page_count);
    }

    let mut extracted = Vec::with_capacity(page_count);
    for (idx, page) in pages.iter().enumerate() {
        let page_number = idx + 1;
        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                // A page without a text layer still counts towards page_count.
                warn!("Page {}: no extractable text ({:?})", page_number, e);
                String::new()
            }
        };
        debug!("Page {}: {} chars of text", page_number, text.len());
        extracted.push(PdfPage { page_number, text });
    }

    Ok(PdfDocument {
        page_count,
        metadata,
        pages: extracted,
    })
}

/// Copy the non-empty information-dictionary entries.
fn read_metadata(document: &pdfium_render::prelude::PdfDocument<'_>) -> BTreeMap<String, String> {
    let metadata = document.metadata();
    let tags = [
        (PdfDocumentMetadataTagType::Title, "title"),
        (PdfDocumentMetadataTagType::Author, "author"),
        (PdfDocumentMetadataTagType::Subject, "subject"),
        (PdfDocumentMetadataTagType::Keywords, "keywords"),
        (PdfDocumentMetadataTagType::Creator, "creator"),
        (PdfDocumentMetadataTagType::Producer, "producer"),
        (PdfDocumentMetadataTagType::CreationDate, "creation_date"),
        (PdfDocumentMetadataTagType::ModificationDate, "modification_date"),
    ];
    tags.into_iter()
        .filter_map(|(tag, name)| {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some((name.to_string(), v))
                }
            })
        })
        .collect()
}
