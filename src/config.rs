//! Configuration for document analysis.
//!
//! All LLM-facing behaviour is controlled through [`AnalyzerConfig`], built
//! via [`AnalyzerConfigBuilder`] or loaded with [`AnalyzerConfig::from_env`].
//! The config is constructed once at startup and shared read-only by every
//! request; nothing in it changes while the service runs.
//!
//! # Credential sources
//!
//! API keys come from `<PROVIDER>_API_KEY` environment variables. When a
//! secrets document is configured (`DOCPROC_SECRETS_FILE`), keys missing from
//! the environment are filled from it. The document is a flat JSON object
//! using the same variable names, e.g. `{"OPENAI_API_KEY": "sk-…"}`, which is
//! the shape hosted secret stores hand out as their secret string.

use crate::error::DocProcError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Provider used when neither the request nor the environment names one.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Providers that need an API key, with their fixed default model.
///
/// The first entry doubles as the fallback for providers without a mapping.
pub const DEFAULT_MODELS: &[(&str, &str)] = &[
    ("openai", "gpt-4-turbo"),
    ("anthropic", "claude-3-opus-20240229"),
    ("cohere", "command-r-plus"),
    ("gemini", "gemini-pro"),
];

/// Providers whose `<PROVIDER>_MODEL` variable is read by
/// [`AnalyzerConfig::from_env`]: everything in [`DEFAULT_MODELS`] plus the
/// providers the LLM client can build.
pub const MODEL_OVERRIDE_PROVIDERS: &[&str] = &[
    "openai",
    "anthropic",
    "cohere",
    "gemini",
    "openrouter",
    "xai",
    "huggingface",
    "mistral",
    "azure",
    "ollama",
    "lmstudio",
    "mock",
];

/// Configuration for the analysis pipeline.
///
/// # Example
/// ```rust
/// use docproc::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .default_provider("anthropic")
///     .api_key("anthropic", "sk-ant-test")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.model_for("anthropic"), "claude-3-opus-20240229");
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Provider used when a request does not name one. Default: `openai`.
    pub default_provider: String,

    /// Provider name → model identifier.
    ///
    /// Seeded from [`DEFAULT_MODELS`]; `<PROVIDER>_MODEL` environment
    /// variables override individual entries.
    pub default_models: BTreeMap<String, String>,

    /// Provider name → API key.
    pub api_keys: BTreeMap<String, String>,

    /// Sampling temperature for the completion. Default: 0.1.
    ///
    /// Extraction wants the model to stay close to the document, so the
    /// default is near-deterministic.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Explicit path to the pdfium shared library.
    ///
    /// When None, the working directory and then the system library path
    /// are searched.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_models: DEFAULT_MODELS
                .iter()
                .map(|(p, m)| (p.to_string(), m.to_string()))
                .collect(),
            api_keys: BTreeMap::new(),
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.api_keys.keys().map(String::as_str).collect();
        let redacted = format!("<redacted: {:?}>", keys);
        f.debug_struct("AnalyzerConfig")
            .field("default_provider", &self.default_provider)
            .field("default_models", &self.default_models)
            .field("api_keys", &redacted)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// Recognised variables:
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `DEFAULT_LLM_PROVIDER` | provider used when a request names none |
    /// | `<PROVIDER>_MODEL` | model override for any [`MODEL_OVERRIDE_PROVIDERS`] entry or the default provider |
    /// | `<PROVIDER>_API_KEY` | API key for a known provider |
    /// | `DOCPROC_SECRETS_FILE` | JSON secrets document filling missing keys |
    /// | `DOCPROC_TEMPERATURE` | sampling temperature |
    /// | `DOCPROC_MAX_TOKENS` | completion token cap |
    /// | `DOCPROC_SYSTEM_PROMPT` | system prompt override |
    /// | `PDFIUM_LIB_PATH` | pdfium shared library path |
    pub fn from_env() -> Result<Self, DocProcError> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`AnalyzerConfig::from_env`] is this function over `std::env::var`;
    /// tests pass a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DocProcError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(provider) = lookup("DEFAULT_LLM_PROVIDER") {
            builder = builder.default_provider(provider);
        }

        let default_provider = builder.config.default_provider.clone();
        let mut providers: Vec<&str> = MODEL_OVERRIDE_PROVIDERS.to_vec();
        if !providers.contains(&default_provider.as_str()) {
            providers.push(&default_provider);
        }
        for provider in providers {
            if let Some(model) = lookup(&format!("{}_MODEL", provider.to_uppercase())) {
                builder = builder.model(provider, model);
            }
        }

        for (provider, _) in DEFAULT_MODELS {
            if let Some(key) = lookup(&AnalyzerConfig::api_key_var(provider)) {
                builder = builder.api_key(*provider, key);
            }
        }

        if let Some(path) = lookup("DOCPROC_SECRETS_FILE") {
            let secrets = load_secrets_file(Path::new(&path))?;
            builder = builder.fill_missing_keys(&secrets);
        }

        if let Some(t) = lookup("DOCPROC_TEMPERATURE") {
            let t: f32 = t.parse().map_err(|_| {
                DocProcError::InvalidConfig(format!("DOCPROC_TEMPERATURE is not a number: {t}"))
            })?;
            builder = builder.temperature(t);
        }

        if let Some(n) = lookup("DOCPROC_MAX_TOKENS") {
            let n: usize = n.parse().map_err(|_| {
                DocProcError::InvalidConfig(format!("DOCPROC_MAX_TOKENS is not an integer: {n}"))
            })?;
            builder = builder.max_tokens(n);
        }

        if let Some(prompt) = lookup("DOCPROC_SYSTEM_PROMPT") {
            builder = builder.system_prompt(prompt);
        }

        if let Some(path) = lookup("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_lib_path(path);
        }

        builder.build()
    }

    /// Model to use for `provider`.
    ///
    /// A configured model (default map, builder or `<PROVIDER>_MODEL`) wins;
    /// anything else falls back to the OpenAI default model.
    pub fn model_for(&self, provider: &str) -> &str {
        self.default_models
            .get(provider)
            .map(String::as_str)
            .unwrap_or(DEFAULT_MODELS[0].1)
    }

    /// API key configured for `provider`, if any.
    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.api_keys.get(provider).map(String::as_str)
    }

    /// `true` for providers that cannot be called without an API key.
    ///
    /// Local providers (ollama, lmstudio, …) are not in the list.
    pub fn requires_api_key(provider: &str) -> bool {
        DEFAULT_MODELS.iter().any(|(p, _)| *p == provider)
    }

    /// Name of the environment variable carrying `provider`'s key.
    pub fn api_key_var(provider: &str) -> String {
        format!("{}_API_KEY", provider.to_uppercase())
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn default_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.default_provider = provider.into().trim().to_lowercase();
        self
    }

    pub fn model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.config
            .default_models
            .insert(provider.into().to_lowercase(), model.into());
        self
    }

    pub fn api_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.config
            .api_keys
            .insert(provider.into().to_lowercase(), key.into());
        self
    }

    /// Fill keys that are not yet set from a secrets document.
    ///
    /// Entries are looked up by variable name (`OPENAI_API_KEY`, …); keys
    /// already present are never overwritten.
    pub fn fill_missing_keys(mut self, secrets: &BTreeMap<String, String>) -> Self {
        for (provider, _) in DEFAULT_MODELS {
            if self.config.api_keys.contains_key(*provider) {
                continue;
            }
            if let Some(key) = secrets.get(&AnalyzerConfig::api_key_var(provider)) {
                debug!(provider, "API key loaded from secrets document");
                self.config
                    .api_keys
                    .insert(provider.to_string(), key.clone());
            }
        }
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, DocProcError> {
        let c = &self.config;
        if c.default_provider.is_empty() {
            return Err(DocProcError::InvalidConfig(
                "Default provider must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(DocProcError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(DocProcError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if AnalyzerConfig::requires_api_key(&c.default_provider)
            && c.api_key(&c.default_provider).is_none()
        {
            warn!(
                provider = %c.default_provider,
                "No API key configured for the default provider; set {}",
                AnalyzerConfig::api_key_var(&c.default_provider)
            );
        }
        Ok(self.config)
    }
}

/// Read a flat JSON secrets document into a name → value map.
///
/// Non-string values are ignored.
pub fn load_secrets_file(path: &Path) -> Result<BTreeMap<String, String>, DocProcError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DocProcError::InvalidConfig(format!(
            "Cannot read secrets file '{}': {e}",
            path.display()
        ))
    })?;
    parse_secret_string(&raw)
}

/// Parse a secret string (`{"NAME": "value", …}`) into a map.
pub fn parse_secret_string(raw: &str) -> Result<BTreeMap<String, String>, DocProcError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| DocProcError::InvalidConfig(format!("Secrets document is not JSON: {e}")))?;
    let object = value.as_object().ok_or_else(|| {
        DocProcError::InvalidConfig("Secrets document must be a JSON object".into())
    })?;
    Ok(object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect())
}
