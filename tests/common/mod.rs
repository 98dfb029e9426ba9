//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docproc::{
    AnalyzerConfig, CompletionBackend, CompletionRequest, DocProcError, DocumentProcessor,
    ModelSelection,
};
use std::sync::{Arc, Mutex};

/// A completion the mock hands back, plus what it was asked.
pub struct MockBackend {
    answer: Result<String, String>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub selection: ModelSelection,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl MockBackend {
    pub fn answering(answer: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(detail: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(detail.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("backend was never called")
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, DocProcError> {
        self.calls.lock().unwrap().push(RecordedCall {
            selection: request.selection.clone(),
            system_prompt: request.system_prompt.to_string(),
            user_prompt: request.user_prompt.to_string(),
        });
        self.answer.clone().map_err(|detail| DocProcError::AnalysisError {
            provider: request.selection.provider.clone(),
            model: request.selection.model.clone(),
            detail,
        })
    }
}

/// Keys for every keyed provider, so selection never fails fast.
pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .api_key("openai", "sk-test")
        .api_key("anthropic", "sk-ant-test")
        .api_key("cohere", "co-test")
        .api_key("gemini", "gm-test")
        .build()
        .expect("test config is valid")
}

pub fn processor_with(backend: Arc<MockBackend>) -> DocumentProcessor {
    DocumentProcessor::new(test_config(), backend)
}

/// Two text annotations, three entity annotations and a summary.
pub const CONTACT_ANALYSIS: &str = r#"{
  "text_annotations": [
    {"text": "John Doe", "relevance_score": 0.95},
    {"text": "john@example.com", "relevance_score": 0.9}
  ],
  "entity_annotations": [
    {"entity_type": "person", "value": "John Doe", "confidence": 0.98},
    {"entity_type": "email", "value": "john@example.com", "confidence": 0.97},
    {"entity_type": "age", "value": "35", "confidence": 0.9, "normalized_value": 35}
  ],
  "summary": {
    "summary": "Contact record for John Doe.",
    "key_points": ["Name: John Doe", "Email: john@example.com"]
  }
}"#;

pub const CONTACT_JSON: &str =
    r#"{"name": "John Doe", "email": "john@example.com", "age": 35}"#;
