//! The normalized, type-tagged form of a parsed document.
//!
//! Extraction produces a [`NormalizedDocument`]; the prompt builder and the
//! response assembler only ever look at this type, never at the raw payload.

use crate::request::DocumentType;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDocument {
    /// Detected container format, upper case (`PNG`, `JPEG`, …).
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Colour mode (`L`, `LA`, `RGB`, `RGBA`, …).
    pub mode: String,
    /// The decoded bytes re-encoded as standard base64.
    pub base64_data: String,
}

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfPage {
    /// 1-indexed page number.
    pub page_number: usize,
    pub text: String,
}

/// A parsed PDF.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfDocument {
    pub page_count: usize,
    /// Non-empty information-dictionary entries (`author`, `title`, …).
    pub metadata: BTreeMap<String, String>,
    /// Pages in document order.
    pub pages: Vec<PdfPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum NormalizedDocument {
    Json(Value),
    Image(ImageDocument),
    Pdf(PdfDocument),
}

impl NormalizedDocument {
    pub fn document_type(&self) -> DocumentType {
        match self {
            NormalizedDocument::Json(_) => DocumentType::Json,
            NormalizedDocument::Image(_) => DocumentType::Image,
            NormalizedDocument::Pdf(_) => DocumentType::Pdf,
        }
    }

    /// Type-specific metadata for the response.
    ///
    /// Derived from the document alone so the caller gets facts the LLM
    /// cannot have invented.
    pub fn metadata(&self) -> Map<String, Value> {
        let value = match self {
            NormalizedDocument::Image(img) => json!({
                "image_type": img.format,
                "width": img.width,
                "height": img.height,
                "mode": img.mode,
            }),
            NormalizedDocument::Pdf(pdf) => json!({
                "page_count": pdf.page_count,
                "metadata": pdf.metadata,
            }),
            NormalizedDocument::Json(Value::Object(map)) => json!({
                "keys": map.keys().collect::<Vec<_>>(),
                "size": map.len(),
            }),
            NormalizedDocument::Json(Value::Array(items)) => json!({
                "length": items.len(),
                "type": "array",
            }),
            NormalizedDocument::Json(scalar) => json!({ "type": json_kind(scalar) }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
