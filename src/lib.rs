//! # pdf2llm
//!
//! Convert PDF documents to Markdown with a hosted OCR service, then ask
//! questions about them to a streaming language-model agent.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Input     local files or URLs → named byte buffers
//!  ├─ 2. Convert   one OCR call per document, in upload order;
//!  │               a failed document never stops the others
//!  ├─ 3. Context   converted documents joined under name headers
//!  ├─ 4. Ask       context + question → streamed answer fragments
//!  └─ 5. Answer    fragments accumulated into the current answer session
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2llm::{DocumentQa, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads MISTRAL_API_KEY and MISTRAL_AGENT_ID
//!     let config = ServiceConfig::from_env()?;
//!     let mut qa = DocumentQa::new(config)?;
//!
//!     qa.add_inputs(&["manual.pdf", "warranty.pdf"]).await?;
//!     let summary = qa.convert_all().await?;
//!     eprintln!("{}/{} converted", summary.converted, summary.attempted);
//!
//!     qa.ask("How long is the warranty?", |fragment| print!("{fragment}"))
//!         .await?;
//!     println!();
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2llm` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2llm = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod answer;
pub mod config;
pub mod context;
pub mod convert;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod qa;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use answer::{AnswerAccumulator, AnswerSession};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use convert::{join_pages, ConversionPipeline, ConversionProgress, ConversionSummary};
pub use document::{ConversionState, DocumentEntry, DocumentFile, DocumentId, EntrySummary};
pub use error::Pdf2LlmError;
pub use pipeline::completion::{FragmentStream, StreamingAnswerClient};
pub use pipeline::ocr::OcrClient;
pub use pipeline::transport::{CompletionTransport, MistralTransport, OcrTransport};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use qa::DocumentQa;
pub use stream::{answer_question, AnswerOutcome};
