//! Prompts for LLM-based document analysis.
//!
//! Every piece of text sent to the model is built here, so prompt changes
//! never touch the request or error-handling code in [`crate::pipeline::llm`].
//! The user prompt is a pure function of the normalized document and the
//! caller's instructions; unit tests pin its exact layout.
//!
//! Callers can override the system prompt via
//! [`crate::config::AnalyzerConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

use crate::document::NormalizedDocument;
use schemars::{schema_for, JsonSchema};
use std::fmt::Write as _;

/// Default system prompt for document analysis.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert document analyzer. Extract relevant information from the provided document based on the instructions. Provide structured output with text annotations, entity annotations, and a summary.";

/// Closing line of every user prompt.
pub const ANALYSIS_REQUEST: &str = "Based on the document and instructions provided, create a detailed analysis with text annotations, entity annotations, and a summary.";

/// Output-format rules appended to the system prompt, with `T`'s schema.
pub fn schema_instruction<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Respond with a single JSON object that conforms to this JSON Schema:\n\n{schema}\n\n\
         Output ONLY the JSON object. Do NOT wrap it in ``` fences and do NOT add commentary.\n\
         Scores and confidences are numbers between 0 and 1. Page numbers start at 1."
    )
}

/// Build the user prompt for `document`.
pub fn build_prompt(document: &NormalizedDocument, instructions: &str) -> String {
    let mut prompt = format!(
        "# Document Analysis Task\n\n## Instructions\n{}\n\n## Document Type\n{}\n\n## Document Content\n",
        instructions,
        document.document_type()
    );

    // Writing into a String cannot fail.
    match document {
        NormalizedDocument::Image(image) => {
            let _ = write!(
                prompt,
                "Image of type {} with dimensions {}x{}.\nBase64 data is available but not displayed for brevity.\n\n",
                image.format, image.width, image.height
            );
        }
        NormalizedDocument::Pdf(pdf) => {
            prompt.push_str("PDF content:\n\n");
            for page in &pdf.pages {
                let _ = write!(prompt, "Page {}:\n{}\n\n", page.page_number, page.text);
            }
        }
        NormalizedDocument::Json(value) => {
            let _ = write!(prompt, "JSON content:\n{}\n\n", value);
        }
    }

    prompt.push_str(ANALYSIS_REQUEST);
    prompt
}
