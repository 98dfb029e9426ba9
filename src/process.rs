//! Request orchestration: detection → extraction → prompt → analysis →
//! response.
//!
//! [`DocumentProcessor::process`] is the single entry point used by both the
//! HTTP server and the CLI. It never returns an error: every failure past
//! request validation becomes a [`ProcessResponse`] with `success = false`
//! and the error's display message. There are no partial results.

use crate::config::AnalyzerConfig;
use crate::document::NormalizedDocument;
use crate::error::DocProcError;
use crate::output::{AnalysisResult, LlmAnalysis, ProcessResponse};
use crate::pipeline::llm::{AnalysisRequestor, CompletionBackend, EdgequakeBackend};
use crate::pipeline::{detect, extract};
use crate::progress::{NoopStageObserver, ProcessStage, SharedObserver};
use crate::prompts::build_prompt;
use crate::request::{DocumentData, DocumentType, ProcessRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared, immutable request handler.
///
/// Cheap to clone; all state sits behind `Arc`.
#[derive(Clone)]
pub struct DocumentProcessor {
    config: Arc<AnalyzerConfig>,
    requestor: AnalysisRequestor,
    observer: SharedObserver,
}

impl DocumentProcessor {
    /// Build a processor around an explicit completion backend.
    pub fn new(config: AnalyzerConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let config = Arc::new(config);
        Self {
            requestor: AnalysisRequestor::new(Arc::clone(&config), backend),
            config,
            observer: Arc::new(NoopStageObserver),
        }
    }

    /// Build a processor that calls real providers through `edgequake-llm`.
    pub fn with_default_backend(config: AnalyzerConfig) -> Self {
        Self::new(config, Arc::new(EdgequakeBackend))
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Handle one wire request.
    pub async fn process(&self, request: ProcessRequest) -> ProcessResponse {
        let ProcessRequest {
            document_data,
            document_type,
            llm_provider,
            instructions,
        } = request;
        self.process_data(
            DocumentData::Text(document_data),
            document_type,
            llm_provider.as_deref(),
            &instructions,
        )
        .await
    }

    /// Handle a document that did not arrive as a JSON string.
    pub async fn process_data(
        &self,
        data: DocumentData,
        declared: Option<DocumentType>,
        provider: Option<&str>,
        instructions: &str,
    ) -> ProcessResponse {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let mut run = Run {
            request_id: &request_id,
            stage: ProcessStage::Received,
            observer: &self.observer,
        };
        run.enter(ProcessStage::Received);

        match self
            .run(&mut run, data, declared, provider, instructions)
            .await
        {
            Ok(result) => {
                run.enter(ProcessStage::Assembled);
                info!(
                    request_id = %request_id,
                    document_type = %result.document_type,
                    text_annotations = result.text_annotations.len(),
                    entity_annotations = result.entity_annotations.len(),
                    "Request processed in {:?}",
                    start.elapsed()
                );
                ProcessResponse::success(request_id, result)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    request_id = %request_id,
                    stage = %run.stage,
                    kind = e.kind(),
                    "Request failed: {}",
                    message
                );
                self.observer.on_failure(&request_id, run.stage, &message);
                run.enter(ProcessStage::Failed);
                ProcessResponse::failure(request_id, message)
            }
        }
    }

    async fn run(
        &self,
        run: &mut Run<'_>,
        data: DocumentData,
        declared: Option<DocumentType>,
        provider: Option<&str>,
        instructions: &str,
    ) -> Result<AnalysisResult, DocProcError> {
        if instructions.trim().is_empty() {
            return Err(DocProcError::InvalidRequest(
                "instructions must not be empty".into(),
            ));
        }

        let document_type = detect::detect(&data, declared)?;
        run.enter(ProcessStage::TypeDetermined);

        let document =
            extract::extract(data, document_type, self.config.pdfium_lib_path.as_deref()).await?;
        run.enter(ProcessStage::Extracted);

        let prompt = build_prompt(&document, instructions);
        run.enter(ProcessStage::PromptBuilt);

        let selection = self.requestor.select(provider);
        debug!(
            request_id = %run.request_id,
            provider = %selection.provider,
            model = %selection.model,
            "Requesting analysis"
        );
        let (analysis, raw) = self
            .requestor
            .request_structured_completion::<LlmAnalysis>(&selection, None, &prompt)
            .await?;
        run.enter(ProcessStage::Analyzed);

        Ok(assemble(&document, analysis, raw))
    }
}

/// Combine document metadata with the model's annotations.
pub fn assemble(
    document: &NormalizedDocument,
    analysis: LlmAnalysis,
    raw: serde_json::Value,
) -> AnalysisResult {
    AnalysisResult {
        document_type: document.document_type(),
        metadata: document.metadata(),
        text_annotations: analysis.text_annotations,
        entity_annotations: analysis.entity_annotations,
        summary: analysis.summary,
        raw_llm_response: Some(raw),
    }
}

/// Stage bookkeeping for one request.
struct Run<'a> {
    request_id: &'a str,
    stage: ProcessStage,
    observer: &'a SharedObserver,
}

impl Run<'_> {
    fn enter(&mut self, stage: ProcessStage) {
        debug!(request_id = %self.request_id, from = %self.stage, to = %stage, "Stage transition");
        self.stage = stage;
        self.observer.on_stage(self.request_id, stage);
    }
}
