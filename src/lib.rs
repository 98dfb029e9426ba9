//! # docproc
//!
//! Analyse JSON, image and PDF documents with an LLM and return structured
//! annotations.
//!
//! A request carries a document (JSON text, or a base64 / data-URL encoded
//! image or PDF), free-text instructions and optionally a provider name. The
//! document is parsed locally, described to the model in a fixed prompt
//! layout, and the model's answer is forced into a typed schema of text
//! annotations, entity annotations and a summary.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ProcessRequest
//!  │
//!  ├─ 1. Detect    declared type, else data-URL / JSON / base64 heuristics
//!  ├─ 2. Extract   serde_json / image decode / pdfium text (spawn_blocking)
//!  ├─ 3. Prompt    deterministic Markdown prompt from the normalized document
//!  ├─ 4. Analyze   provider + model selection, schema-constrained completion
//!  └─ 5. Assemble  metadata from the document + annotations from the model
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docproc::{AnalyzerConfig, DocumentProcessor, ProcessRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider and keys from DEFAULT_LLM_PROVIDER / OPENAI_API_KEY / …
//!     let config = AnalyzerConfig::from_env()?;
//!     let processor = DocumentProcessor::with_default_backend(config);
//!     let request = ProcessRequest::new(
//!         r#"{"name": "John Doe", "email": "john@example.com"}"#,
//!         "Extract contact information.",
//!     );
//!     let response = processor.process(request).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docproc` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library or the router:
//! ```toml
//! docproc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod request;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use document::NormalizedDocument;
pub use error::DocProcError;
pub use output::{
    AnalysisResult, EntityAnnotation, LlmAnalysis, ProcessResponse, SummaryAnnotation,
    TextAnnotation,
};
pub use pipeline::llm::{
    AnalysisRequestor, CompletionBackend, CompletionRequest, EdgequakeBackend, ModelSelection,
    StructuredOutput,
};
pub use process::DocumentProcessor;
pub use progress::{ProcessStage, StageObserver};
pub use request::{DocumentData, DocumentType, ProcessRequest};
