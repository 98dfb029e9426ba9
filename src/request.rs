//! Request types: what a caller hands to the processor.

use crate::error::DocProcError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Json,
    Image,
    Pdf,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Json => "json",
            DocumentType::Image => "image",
            DocumentType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = DocProcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentType::Json),
            "image" => Ok(DocumentType::Image),
            "pdf" => Ok(DocumentType::Pdf),
            other => Err(DocProcError::InvalidRequest(format!(
                "unsupported document type '{other}' (expected json, image or pdf)"
            ))),
        }
    }
}

/// Raw document payload before type detection.
///
/// HTTP requests always carry [`DocumentData::Text`]; the other variants
/// exist for library callers that already hold bytes or a parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentData {
    /// Raw JSON text, base64, or a `data:` URL.
    Text(String),
    /// Undecoded file contents.
    Bytes(Vec<u8>),
    /// An already-decoded JSON value.
    Structured(serde_json::Value),
}

impl From<String> for DocumentData {
    fn from(s: String) -> Self {
        DocumentData::Text(s)
    }
}

impl From<&str> for DocumentData {
    fn from(s: &str) -> Self {
        DocumentData::Text(s.to_string())
    }
}

impl From<Vec<u8>> for DocumentData {
    fn from(b: Vec<u8>) -> Self {
        DocumentData::Bytes(b)
    }
}

impl From<serde_json::Value> for DocumentData {
    fn from(v: serde_json::Value) -> Self {
        DocumentData::Structured(v)
    }
}

/// Wire shape of `POST /process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Document data (base64 encoded, data URL, or JSON string).
    pub document_data: String,

    /// Type of document. Detected from the payload when absent.
    #[serde(default)]
    pub document_type: Option<DocumentType>,

    /// LLM provider to use. Uses the configured default when absent.
    #[serde(default)]
    pub llm_provider: Option<String>,

    /// Instructions for processing the document.
    pub instructions: String,
}

impl ProcessRequest {
    pub fn new(document_data: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            document_data: document_data.into(),
            document_type: None,
            llm_provider: None,
            instructions: instructions.into(),
        }
    }

    pub fn with_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.llm_provider = Some(provider.into());
        self
    }

    /// Check the request invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), DocProcError> {
        if self.instructions.trim().is_empty() {
            return Err(DocProcError::InvalidRequest(
                "instructions must not be empty".into(),
            ));
        }
        if self
            .llm_provider
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(DocProcError::InvalidRequest(
                "llm_provider must not be empty when given".into(),
            ));
        }
        Ok(())
    }

    /// The provider named by the request, normalised to lower case.
    pub fn provider(&self) -> Option<String> {
        self.llm_provider.as_deref().map(|p| p.trim().to_lowercase())
    }
}
