//! LLM interaction: select a model, call it, and parse structured output.
//!
//! The provider call sits behind [`CompletionBackend`] so the rest of the
//! pipeline only sees "system + user prompt in, text out". Structured output
//! is enforced on our side: the target type's JSON Schema is appended to the
//! system prompt, and the answer is cleaned, deserialized and range-checked
//! before anything downstream sees it.
//!
//! There is no retry. A provider error or a malformed answer fails the
//! request with [`DocProcError::AnalysisError`].

use crate::config::AnalyzerConfig;
use crate::error::DocProcError;
use crate::pipeline::postprocess::extract_json_text;
use crate::prompts::{schema_instruction, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, LLMProvider,
    OpenAIProvider, OpenRouterProvider, ProviderFactory, ProviderType,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A type the model can be asked to produce.
///
/// The schema comes from [`JsonSchema`]; `validate` adds the constraints a
/// schema cannot express cheaply (numeric ranges and the like).
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Provider and model chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider: String,
    pub model: String,
}

/// Everything a backend needs for one chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub selection: &'a ModelSelection,
    pub api_key: Option<&'a str>,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Raw text completion from some LLM provider.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, DocProcError>;
}

/// Provider names the `edgequake-llm` client can build, for error messages.
pub const SUPPORTED_PROVIDERS: &str =
    "openai, anthropic, gemini, openrouter, xai, huggingface, mistral, azure, ollama, lmstudio, mock";

/// Production backend driving `edgequake-llm`.
///
/// A provider is created per call by [`create_provider`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgequakeBackend;

#[async_trait]
impl CompletionBackend for EdgequakeBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, DocProcError> {
        let ModelSelection { provider, model } = request.selection;
        let llm = create_provider(request.selection, request.api_key)?;

        let messages = vec![
            ChatMessage::system(request.system_prompt),
            ChatMessage::user(request.user_prompt),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = llm
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| DocProcError::analysis(provider, model, e.to_string()))?;

        debug!(
            "{}/{}: {} input tokens, {} output tokens",
            provider, model, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Build the `edgequake-llm` provider for `selection`.
///
/// A configured key is passed straight to the provider's keyed constructor.
/// Without one, [`ProviderFactory`] is used and reads its own environment
/// (`OLLAMA_HOST`, `XAI_API_KEY`, …).
pub fn create_provider(
    selection: &ModelSelection,
    api_key: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, DocProcError> {
    let ModelSelection { provider, model } = selection;
    let Some(kind) = ProviderType::from_str(provider) else {
        return Err(DocProcError::analysis(
            provider,
            model,
            format!(
                "provider '{provider}' is not supported by the LLM client (supported: {SUPPORTED_PROVIDERS})"
            ),
        ));
    };

    let llm: Arc<dyn LLMProvider> = match (kind, api_key) {
        (ProviderType::OpenAI, Some(key)) => Arc::new(OpenAIProvider::new(key).with_model(model)),
        (ProviderType::Anthropic, Some(key)) => {
            Arc::new(AnthropicProvider::new(key).with_model(model))
        }
        (ProviderType::OpenRouter, Some(key)) => {
            Arc::new(OpenRouterProvider::new(key).with_model(model))
        }
        // Vertex AI authenticates with gcloud credentials, not an API key.
        (ProviderType::Gemini, Some(key)) if !model.starts_with("vertexai:") => {
            Arc::new(GeminiProvider::new(key).with_model(model))
        }
        _ => ProviderFactory::create_llm_provider(provider, model)
            .map_err(|e| DocProcError::analysis(provider, model, format!("provider setup: {e}")))?,
    };
    Ok(llm)
}

/// Issues structured completions against the configured providers.
#[derive(Clone)]
pub struct AnalysisRequestor {
    config: Arc<AnalyzerConfig>,
    backend: Arc<dyn CompletionBackend>,
}

impl AnalysisRequestor {
    pub fn new(config: Arc<AnalyzerConfig>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { config, backend }
    }

    /// Pick the provider and model for a request.
    ///
    /// The request's provider wins over the configured default; the model
    /// always comes from configuration.
    pub fn select(&self, provider: Option<&str>) -> ModelSelection {
        let provider = provider
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.config.default_provider.clone());
        let model = self.config.model_for(&provider).to_string();
        ModelSelection { provider, model }
    }

    /// Ask `selection` for an instance of `T`.
    ///
    /// `system_prompt` defaults to the configured override, then to
    /// [`DEFAULT_SYSTEM_PROMPT`]. The schema instruction for `T` is always
    /// appended.
    pub async fn request_structured_completion<T: StructuredOutput>(
        &self,
        selection: &ModelSelection,
        system_prompt: Option<&str>,
        user_prompt: &str,
    ) -> Result<(T, serde_json::Value), DocProcError> {
        let ModelSelection { provider, model } = selection;
        let api_key = self.config.api_key(provider);
        if AnalyzerConfig::requires_api_key(provider) && api_key.is_none() {
            return Err(DocProcError::analysis(
                provider.as_str(),
                model.as_str(),
                format!(
                    "no API key configured (set {})",
                    AnalyzerConfig::api_key_var(provider)
                ),
            ));
        }

        let base = system_prompt
            .or(self.config.system_prompt.as_deref())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let system_prompt = format!("{base}\n\n{}", schema_instruction::<T>());

        let start = Instant::now();
        let raw = self
            .backend
            .complete(CompletionRequest {
                selection,
                api_key,
                system_prompt: &system_prompt,
                user_prompt,
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            })
            .await?;
        info!(
            provider = %provider,
            model = %model,
            "Completion received in {:?} ({} chars)",
            start.elapsed(),
            raw.len()
        );

        parse_structured(&raw).map_err(|detail| {
            warn!(provider = %provider, model = %model, "Unusable completion: {}", detail);
            DocProcError::analysis(provider.as_str(), model.as_str(), detail)
        })
    }
}

/// Clean `raw`, deserialize it into `T` and validate.
///
/// Returns the typed value together with the parsed JSON it came from.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<(T, serde_json::Value), String> {
    let text = extract_json_text(raw);
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("completion is not valid JSON: {e}"))?;
    let parsed: T = serde_json::from_value(value.clone())
        .map_err(|e| format!("completion does not match the schema: {e}"))?;
    parsed.validate()?;
    Ok((parsed, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::LlmAnalysis;
    use std::sync::Mutex;

    struct CannedBackend {
        answer: Result<String, String>,
        seen: Mutex<Vec<(ModelSelection, String)>>,
    }

    impl CannedBackend {
        fn ok(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, DocProcError> {
            self.seen.lock().unwrap().push((
                request.selection.clone(),
                request.system_prompt.to_string(),
            ));
            self.answer.clone().map_err(|e| {
                DocProcError::analysis(
                    request.selection.provider.as_str(),
                    request.selection.model.as_str(),
                    e,
                )
            })
        }
    }

    fn config() -> Arc<AnalyzerConfig> {
        Arc::new(
            AnalyzerConfig::builder()
                .api_key("openai", "sk-test")
                .api_key("anthropic", "sk-ant-test")
                .build()
                .unwrap(),
        )
    }

    const ANSWER: &str = r#"```json
{"text_annotations": [{"text": "John Doe", "relevance_score": 0.9}],
 "entity_annotations": [{"entity_type": "person", "value": "John Doe", "confidence": 0.95}],
 "summary": {"summary": "A contact record.", "key_points": ["name"]}}
```"#;

    #[test]
    fn select_defaults_and_override() {
        let r = AnalysisRequestor::new(config(), CannedBackend::ok("{}"));
        assert_eq!(
            r.select(None),
            ModelSelection {
                provider: "openai".into(),
                model: "gpt-4-turbo".into()
            }
        );
        assert_eq!(r.select(Some("Anthropic")).model, "claude-3-opus-20240229");
        assert_eq!(r.select(Some("  ")).provider, "openai");
    }

    #[test]
    fn select_uses_env_model_for_local_provider() {
        let config = AnalyzerConfig::from_lookup(|name| {
            (name == "OLLAMA_MODEL").then(|| "llama3".to_string())
        })
        .unwrap();
        let r = AnalysisRequestor::new(Arc::new(config), CannedBackend::ok("{}"));
        assert_eq!(
            r.select(Some("ollama")),
            ModelSelection {
                provider: "ollama".into(),
                model: "llama3".into()
            }
        );
    }

    #[tokio::test]
    async fn structured_completion_parses_fenced_answer() {
        let backend = CannedBackend::ok(ANSWER);
        let r = AnalysisRequestor::new(config(), backend.clone());
        let sel = r.select(None);
        let (analysis, raw): (LlmAnalysis, _) = r
            .request_structured_completion(&sel, None, "prompt")
            .await
            .unwrap();
        assert_eq!(analysis.text_annotations.len(), 1);
        assert_eq!(analysis.entity_annotations[0].entity_type, "person");
        assert_eq!(raw["summary"]["summary"], "A contact record.");

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].1.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(seen[0].1.contains("text_annotations"));
    }

    #[tokio::test]
    async fn missing_key_fails_fast() {
        let backend = CannedBackend::ok(ANSWER);
        let r = AnalysisRequestor::new(config(), backend.clone());
        let sel = r.select(Some("cohere"));
        let err = r
            .request_structured_completion::<LlmAnalysis>(&sel, None, "prompt")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("COHERE_API_KEY"), "got: {err}");
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_error_propagates() {
        let backend = Arc::new(CannedBackend {
            answer: Err("rate limited".into()),
            seen: Mutex::new(Vec::new()),
        });
        let r = AnalysisRequestor::new(config(), backend);
        let sel = r.select(None);
        let err = r
            .request_structured_completion::<LlmAnalysis>(&sel, None, "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, DocProcError::AnalysisError { .. }));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn configured_key_builds_provider_without_env() {
        std::env::remove_var("OPENAI_API_KEY");
        let selection = ModelSelection {
            provider: "openai".into(),
            model: "gpt-4-turbo".into(),
        };

        let llm = create_provider(&selection, Some("sk-from-config")).unwrap();
        assert_eq!(llm.name(), "openai");
        assert_eq!(llm.model(), "gpt-4-turbo");

        let err = create_provider(&selection, None).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"), "got: {err}");
    }

    #[test]
    fn keyed_constructors_cover_anthropic_and_gemini() {
        let anthropic = ModelSelection {
            provider: "anthropic".into(),
            model: "claude-3-opus-20240229".into(),
        };
        let llm = create_provider(&anthropic, Some("sk-ant-test")).unwrap();
        assert_eq!(llm.model(), "claude-3-opus-20240229");

        let gemini = ModelSelection {
            provider: "gemini".into(),
            model: "gemini-pro".into(),
        };
        let llm = create_provider(&gemini, Some("g-key")).unwrap();
        assert_eq!(llm.model(), "gemini-pro");
    }

    #[test]
    fn unsupported_provider_names_the_alternatives() {
        let selection = ModelSelection {
            provider: "cohere".into(),
            model: "command-r-plus".into(),
        };
        let err = create_provider(&selection, Some("co-key")).err().unwrap();
        let msg = err.to_string();
        assert!(matches!(err, DocProcError::AnalysisError { .. }));
        assert!(msg.contains("'cohere' is not supported"), "got: {msg}");
        assert!(msg.contains("anthropic"), "got: {msg}");
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let raw = r#"{"text_annotations": [{"text": "x", "relevance_score": 1.5}]}"#;
        let err = parse_structured::<LlmAnalysis>(raw).unwrap_err();
        assert!(err.contains("relevance_score"), "got: {err}");
    }

    #[test]
    fn prose_answer_is_rejected() {
        let err = parse_structured::<LlmAnalysis>("I could not read the document.").unwrap_err();
        assert!(err.contains("not valid JSON"), "got: {err}");
    }
}
