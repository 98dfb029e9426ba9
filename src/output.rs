//! Output types: the analysis the LLM fills in and the response envelope.

use crate::pipeline::llm::StructuredOutput;
use crate::request::DocumentType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rectangle locating an annotation inside an image, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A span of text the LLM extracted or annotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextAnnotation {
    /// Extracted or annotated text.
    pub text: String,
    /// Relevance score between 0 and 1.
    #[serde(default)]
    pub relevance_score: Option<f64>,
    /// Page number for PDF documents (1-indexed).
    #[serde(default)]
    pub page_number: Option<u32>,
    /// Bounding box for images.
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

/// A typed entity (person, date, amount, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityAnnotation {
    /// Type of entity (person, date, amount, etc).
    pub entity_type: String,
    /// Entity value as it appears in the document.
    pub value: String,
    /// Confidence score between 0 and 1.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Normalized value (e.g. an ISO date or a number).
    #[serde(default)]
    pub normalized_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryAnnotation {
    /// Document summary.
    pub summary: String,
    /// Key points from the document.
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// The part of the analysis produced by the LLM.
///
/// This is the target schema sent with every completion request; the
/// document type and metadata are never asked of the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LlmAnalysis {
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    pub entity_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub summary: Option<SummaryAnnotation>,
}

impl StructuredOutput for LlmAnalysis {
    fn validate(&self) -> Result<(), String> {
        for (i, t) in self.text_annotations.iter().enumerate() {
            check_unit_interval(t.relevance_score, || {
                format!("text_annotations[{i}].relevance_score")
            })?;
            if t.page_number == Some(0) {
                return Err(format!("text_annotations[{i}].page_number must be ≥ 1"));
            }
        }
        for (i, e) in self.entity_annotations.iter().enumerate() {
            check_unit_interval(e.confidence, || format!("entity_annotations[{i}].confidence"))?;
        }
        Ok(())
    }
}

fn check_unit_interval(score: Option<f64>, field: impl FnOnce() -> String) -> Result<(), String> {
    match score {
        Some(s) if !(0.0..=1.0).contains(&s) => {
            Err(format!("{} must be between 0 and 1, got {s}", field()))
        }
        _ => Ok(()),
    }
}

/// Complete analysis of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Type of document processed.
    pub document_type: DocumentType,
    /// Metadata read from the document itself, never from the LLM.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    pub entity_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub summary: Option<SummaryAnnotation>,
    /// The validated LLM object, kept for debugging.
    #[serde(default)]
    pub raw_llm_response: Option<Value>,
}

/// Response envelope for `POST /process`.
///
/// The pipeline builds it with [`ProcessResponse::success`] or
/// [`ProcessResponse::failure`], which keep `success`, `result` and
/// `error_message` consistent. The fields stay public for clients that
/// deserialize responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    /// Unique request ID.
    pub request_id: String,
    /// Whether processing was successful.
    pub success: bool,
    /// Error message if processing failed.
    pub error_message: Option<String>,
    /// Document analysis result.
    pub result: Option<AnalysisResult>,
}

impl ProcessResponse {
    pub fn success(request_id: impl Into<String>, result: AnalysisResult) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            error_message: None,
            result: Some(result),
        }
    }

    pub fn failure(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            error_message: Some(message.into()),
            result: None,
        }
    }
}
