//! CLI binary for pdf2llm.
//!
//! A thin shim over the library crate: resolves the inputs, converts them,
//! then streams one answer per question to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2llm::{
    AnswerOutcome, AnswerSession, ConversionProgressCallback, ConversionSummary, DocumentId,
    DocumentQa, EntrySummary, ProgressCallback, ServiceConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the run and one log line per
/// document.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<DocumentId, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, id: DocumentId) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&id))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, to_convert: usize) {
        self.bar.set_length(to_convert as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {to_convert} documents…"))
        ));
    }

    fn on_entry_start(&self, id: DocumentId, name: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(id, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_entry_complete(&self, id: DocumentId, name: &str, markdown_len: usize) {
        let secs = self.elapsed_secs(id);
        self.bar.println(format!(
            "  {} {:<32}  {:<12}  {}",
            green("✓"),
            name,
            dim(&format!("{markdown_len:>6} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_entry_error(&self, id: DocumentId, name: &str, error: &str) {
        let secs = self.elapsed_secs(id);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<32}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, attempted: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents converted  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                attempted,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert two manuals and ask one question
  pdf2llm manual.pdf warranty.pdf -Q "How long is the warranty?"

  # Several questions, answered one after the other
  pdf2llm manual.pdf -Q "What is the max load?" -Q "Which fuse is used?"

  # Questions from stdin, one per line
  cat questions.txt | pdf2llm manual.pdf

  # Convert from URL
  pdf2llm https://example.com/datasheet.pdf -Q "Operating temperature?"

  # Print the Markdown context only (no agent call)
  pdf2llm --context-only manual.pdf > manual.md

  # JSON output: entries, summary and answers
  pdf2llm --json manual.pdf -Q "Dimensions?" > result.json

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY         API key for both OCR and the agent
  MISTRAL_AGENT_ID        Agent answering questions
  MISTRAL_BASE_URL        Override the API root (default https://api.mistral.ai/v1)
  MISTRAL_OCR_MODEL       Override the OCR model (default mistral-ocr-latest)

SETUP:
  1. Set credentials:  export MISTRAL_API_KEY=... MISTRAL_AGENT_ID=ag:...
  2. Ask:              pdf2llm document.pdf -Q "..."
"#;

/// Ask questions about PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2llm",
    version,
    about = "Convert PDFs to Markdown with OCR and ask questions about them",
    long_about = "Convert PDF documents (local files or URLs) to Markdown with the Mistral OCR \
service, then stream answers to questions from a Mistral agent that sees every converted \
document. A document that fails to convert is reported and left out of the context.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs, in context order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Question to ask; repeat for several. Read from stdin when omitted.
    #[arg(short = 'Q', long = "question")]
    questions: Vec<String>,

    /// API key (overrides MISTRAL_API_KEY).
    #[arg(long)]
    api_key: Option<String>,

    /// Agent id (overrides MISTRAL_AGENT_ID).
    #[arg(long)]
    agent_id: Option<String>,

    /// API root URL (overrides MISTRAL_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// OCR model id (overrides MISTRAL_OCR_MODEL).
    #[arg(long)]
    ocr_model: Option<String>,

    /// Number of documents converted at once.
    #[arg(short, long, env = "PDF2LLM_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Print the Markdown context and exit without asking anything.
    #[arg(long)]
    context_only: bool,

    /// Output structured JSON instead of streamed text.
    #[arg(long, env = "PDF2LLM_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2LLM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2LLM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and answers.
    #[arg(short, long, env = "PDF2LLM_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2LLM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// OCR call timeout in seconds.
    #[arg(long, env = "PDF2LLM_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

/// Shape of `--json` output.
#[derive(Serialize)]
struct JsonReport {
    documents: Vec<EntrySummary>,
    conversion: ConversionSummary,
    answers: Vec<JsonAnswer>,
}

#[derive(Serialize)]
struct JsonAnswer {
    #[serde(flatten)]
    session: AnswerSession,
    #[serde(flatten)]
    outcome: AnswerOutcome,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let mut qa = DocumentQa::new(config).context("Failed to set up the Mistral client")?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        qa = qa.with_progress(cb);
    }

    // ── Convert ──────────────────────────────────────────────────────────
    qa.add_inputs(&cli.inputs)
        .await
        .context("Failed to load input documents")?;
    let summary = qa.convert_all().await.context("Conversion failed")?;

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Converted {}/{} documents in {}ms",
            summary.converted, summary.attempted, summary.duration_ms
        );
        for entry in qa.entries() {
            eprintln!("  {:<10} {}", entry.state.label(), entry.name());
        }
    }
    if summary.converted == 0 && !cli.quiet {
        eprintln!(
            "{} no document could be converted; answers will have no context",
            red("warning:")
        );
    }

    if cli.context_only {
        let context = qa.context();
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(context.as_bytes())
            .context("Failed to write to stdout")?;
        if !context.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    // ── Ask ──────────────────────────────────────────────────────────────
    let questions = if cli.questions.is_empty() {
        read_questions()?
    } else {
        cli.questions.clone()
    };

    let mut answers = Vec::with_capacity(questions.len());
    for question in &questions {
        let outcome = if cli.json {
            qa.ask(question, |_| {}).await?
        } else {
            ask_streaming(&mut qa, question, questions.len() > 1, cli.quiet).await?
        };
        answers.push(JsonAnswer {
            session: qa.answer().clone(),
            outcome,
        });
    }

    if cli.json {
        let report = JsonReport {
            documents: qa.entries().iter().map(EntrySummary::from).collect(),
            conversion: summary,
            answers,
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise output")?;
        println!("{json}");
    }

    Ok(())
}

/// Stream one answer to stdout as it arrives.
async fn ask_streaming(
    qa: &mut DocumentQa,
    question: &str,
    show_question: bool,
    quiet: bool,
) -> Result<AnswerOutcome> {
    if show_question && !quiet {
        eprintln!("{} {}", cyan("?"), bold(question));
    }

    let stdout = io::stdout();
    let outcome = qa
        .ask(question, |fragment| {
            let mut handle = stdout.lock();
            handle.write_all(fragment.as_bytes()).ok();
            handle.flush().ok();
        })
        .await?;

    let mut handle = stdout.lock();
    match &outcome {
        AnswerOutcome::Completed { .. } => {
            handle.write_all(b"\n").ok();
        }
        AnswerOutcome::Failed { detail } => {
            // Whatever was printed live is superseded by the failure message.
            writeln!(handle).ok();
            eprintln!("{} {}", red("✗"), qa.answer_text());
            if !quiet {
                eprintln!("  {}", dim(detail));
            }
        }
    }
    Ok(outcome)
}

/// One question per non-blank stdin line.
fn read_questions() -> Result<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("{}", dim("Enter questions, one per line (Ctrl-D to finish):"));
    }
    let mut questions = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read question from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            questions.push(line.to_string());
        }
    }
    Ok(questions)
}

/// Map CLI args onto the environment-derived [`ServiceConfig`].
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder_from_env()
        .concurrency(cli.concurrency)
        .request_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref agent) = cli.agent_id {
        builder = builder.agent_id(agent.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(ref model) = cli.ocr_model {
        builder = builder.ocr_model(model.clone());
    }

    builder.build().context("Invalid configuration")
}
