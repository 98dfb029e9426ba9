//! CLI binary for docproc.
//!
//! A thin shim over the library crate: `serve` runs the HTTP API, `process`
//! analyses one local file and prints the response as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docproc::pipeline::detect::looks_like_json;
use docproc::server::{self, DEFAULT_BODY_LIMIT_BYTES};
use docproc::{
    AnalyzerConfig, DocumentData, DocumentProcessor, DocumentType, ProcessStage, StageObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI stage observer using indicatif ───────────────────────────────────────

/// Spinner whose message follows the request through the pipeline.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.set_message("reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StageObserver for SpinnerObserver {
    fn on_stage(&self, _request_id: &str, stage: ProcessStage) {
        match stage {
            ProcessStage::TypeDetermined => self.bar.set_message("extracting content…"),
            ProcessStage::Extracted => self.bar.set_message("building prompt…"),
            ProcessStage::PromptBuilt => self.bar.set_message("waiting for the model…"),
            ProcessStage::Analyzed => self.bar.set_message("assembling response…"),
            ProcessStage::Assembled => {
                self.bar.finish_and_clear();
                eprintln!("{} document analysed", green("✔"));
            }
            ProcessStage::Failed | ProcessStage::Received => {}
        }
    }

    fn on_failure(&self, _request_id: &str, last_stage: ProcessStage, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}  {}", red("✘"), red(error), dim(&format!("(after {last_stage})")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on port 8080
  docproc serve --port 8080

  # Analyse a local PDF with the default provider
  docproc process invoice.pdf --instructions "Extract the invoice total and due date."

  # Analyse a JSON document read from stdin with Anthropic
  cat contact.json | docproc process - --type json --provider anthropic \
      --instructions "Extract contact information."

  # The file already holds base64 or a data URL
  docproc process scan.b64 --base64 --instructions "Describe the image."

ENVIRONMENT VARIABLES:
  DEFAULT_LLM_PROVIDER    Provider used when a request names none (default: openai)
  OPENAI_API_KEY          OpenAI API key          (OPENAI_MODEL overrides gpt-4-turbo)
  ANTHROPIC_API_KEY       Anthropic API key       (ANTHROPIC_MODEL overrides claude-3-opus-20240229)
  COHERE_API_KEY          Cohere API key          (no Cohere client yet; requests fail)
  GEMINI_API_KEY          Google Gemini API key   (GEMINI_MODEL overrides gemini-pro)
  OLLAMA_MODEL, …         Model for any other provider (ollama, lmstudio, xai, …)
  DOCPROC_SECRETS_FILE    JSON document holding keys missing from the environment
  DOCPROC_TEMPERATURE     Sampling temperature (default 0.1)
  DOCPROC_MAX_TOKENS      Completion token cap (default 4096)
  DOCPROC_SYSTEM_PROMPT   System prompt override
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

/// Analyse JSON, image and PDF documents with LLM structured output.
#[derive(Parser, Debug)]
#[command(
    name = "docproc",
    version,
    about = "Analyse JSON, image and PDF documents with LLM structured output",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCPROC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCPROC_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "DOCPROC_HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        /// Port to bind.
        #[arg(short, long, env = "DOCPROC_PORT", default_value_t = 8080)]
        port: u16,

        /// Maximum request body size in MiB.
        #[arg(long, env = "DOCPROC_BODY_LIMIT_MB",
              default_value_t = DEFAULT_BODY_LIMIT_BYTES / (1024 * 1024))]
        body_limit_mb: usize,
    },

    /// Analyse one document and print the response as JSON.
    Process {
        /// Document path, or `-` for stdin.
        input: String,

        /// What to extract from the document.
        #[arg(short, long)]
        instructions: String,

        /// Document type: json, image or pdf. Detected when omitted.
        #[arg(short = 't', long = "type")]
        document_type: Option<DocumentType>,

        /// LLM provider for this request (openai, anthropic, cohere, gemini, …).
        #[arg(short, long)]
        provider: Option<String>,

        /// The input already holds base64 or a data URL rather than raw bytes.
        #[arg(long)]
        base64: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // In `process` mode the spinner gives the feedback; library logs stay at
    // warn unless asked for.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match cli.command {
            Command::Serve { .. } => "info",
            Command::Process { .. } => "warn",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let config = AnalyzerConfig::from_env().context("Invalid configuration")?;
    debug!(?config, "Configuration loaded");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, config: AnalyzerConfig) -> Result<ExitCode> {
    match cli.command {
        Command::Serve {
            host,
            port,
            body_limit_mb,
        } => {
            let addr = SocketAddr::new(host, port);
            info!(
                provider = %config.default_provider,
                model = %config.model_for(&config.default_provider),
                "Starting document processor"
            );
            let processor = DocumentProcessor::with_default_backend(config);
            server::serve(processor, addr, body_limit_mb.saturating_mul(1024 * 1024))
                .await
                .with_context(|| format!("Server on {addr} failed"))?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Process {
            input,
            instructions,
            document_type,
            provider,
            base64,
        } => {
            let bytes = read_input(&input).await?;
            let data = to_document_data(bytes, document_type, base64)?;

            let mut processor = DocumentProcessor::with_default_backend(config);
            if !cli.quiet {
                processor = processor.with_observer(SpinnerObserver::new());
            }

            let response = processor
                .process_data(data, document_type, provider.as_deref(), &instructions)
                .await;

            let json = serde_json::to_string_pretty(&response)
                .context("Failed to serialise response")?;
            println!("{json}");

            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    let path = PathBuf::from(input);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Choose how the file content enters the pipeline.
///
/// JSON stays text so detection sees the braces; binary documents go in as
/// raw bytes unless `--base64` says they are already encoded.
fn to_document_data(
    bytes: Vec<u8>,
    declared: Option<DocumentType>,
    base64: bool,
) -> Result<DocumentData> {
    if base64 {
        let text = String::from_utf8(bytes).context("--base64 input is not UTF-8 text")?;
        return Ok(DocumentData::Text(text.trim().to_string()));
    }
    Ok(match String::from_utf8(bytes) {
        Ok(text) if declared == Some(DocumentType::Json) || looks_like_json(&text) => {
            DocumentData::Text(text)
        }
        Ok(text) => DocumentData::Bytes(text.into_bytes()),
        Err(e) => DocumentData::Bytes(e.into_bytes()),
    })
}
