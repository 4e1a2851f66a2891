//! [`DocumentQa`]: the whole core behind one object.
//!
//! This is what a front-end holds. It forwards file management and
//! conversion to the [`ConversionPipeline`], builds the context from the
//! converted entries on every question, and keeps the current
//! [`AnswerSession`] for rendering.

use crate::answer::{AnswerAccumulator, AnswerSession};
use crate::config::ServiceConfig;
use crate::context;
use crate::convert::{ConversionPipeline, ConversionProgress, ConversionSummary};
use crate::document::{DocumentEntry, DocumentFile, DocumentId};
use crate::error::Pdf2LlmError;
use crate::pipeline::completion::StreamingAnswerClient;
use crate::pipeline::input::resolve_input;
use crate::pipeline::ocr::OcrClient;
use crate::pipeline::transport::{CompletionTransport, MistralTransport, OcrTransport};
use crate::progress::ProgressCallback;
use crate::stream::{answer_question, AnswerOutcome};
use std::sync::Arc;

/// Documents, their conversion, and questions about them.
pub struct DocumentQa {
    config: ServiceConfig,
    pipeline: ConversionPipeline,
    answers: StreamingAnswerClient,
    accumulator: AnswerAccumulator,
}

impl DocumentQa {
    /// Connect to the Mistral API described by `config`.
    ///
    /// # Errors
    /// [`Pdf2LlmError::Configuration`] when the API key or agent id is missing.
    pub fn new(config: ServiceConfig) -> Result<Self, Pdf2LlmError> {
        let transport = Arc::new(MistralTransport::new(&config)?);
        Self::with_transports(config, transport.clone(), transport)
    }

    /// Use custom transports, e.g. in-memory fakes.
    pub fn with_transports(
        config: ServiceConfig,
        ocr: Arc<dyn OcrTransport>,
        completion: Arc<dyn CompletionTransport>,
    ) -> Result<Self, Pdf2LlmError> {
        config.validate()?;
        let pipeline = ConversionPipeline::new(OcrClient::new(ocr, &config), &config);
        let answers = StreamingAnswerClient::new(completion, &config);
        Ok(Self {
            config,
            pipeline,
            answers,
            accumulator: AnswerAccumulator::new(),
        })
    }

    /// Receive per-document conversion events.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.pipeline = self.pipeline.with_progress(callback);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.pipeline
    }

    // ── Documents ────────────────────────────────────────────────────────

    pub fn add_files(&self, files: impl IntoIterator<Item = DocumentFile>) -> Vec<DocumentId> {
        self.pipeline.add_files(files)
    }

    /// Resolve local paths or URLs and add them, in the given order.
    ///
    /// All inputs are resolved before any is added, so a bad input leaves
    /// the entry list untouched.
    pub async fn add_inputs<S: AsRef<str>>(
        &self,
        inputs: &[S],
    ) -> Result<Vec<DocumentId>, Pdf2LlmError> {
        let mut files = Vec::with_capacity(inputs.len());
        for input in inputs {
            files.push(resolve_input(input.as_ref(), self.config.download_timeout_secs).await?);
        }
        Ok(self.pipeline.add_files(files))
    }

    pub fn remove_file(&self, id: DocumentId) -> Result<DocumentEntry, Pdf2LlmError> {
        self.pipeline.remove_file(id)
    }

    /// Forget every document and the current answer.
    pub fn reset(&mut self) -> Result<(), Pdf2LlmError> {
        self.pipeline.reset()?;
        self.accumulator = AnswerAccumulator::new();
        Ok(())
    }

    pub async fn convert_all(&self) -> Result<ConversionSummary, Pdf2LlmError> {
        self.pipeline.convert_all().await
    }

    pub fn entries(&self) -> Vec<DocumentEntry> {
        self.pipeline.entries()
    }

    pub fn progress(&self) -> ConversionProgress {
        self.pipeline.progress()
    }

    pub fn is_converting(&self) -> bool {
        self.pipeline.is_converting()
    }

    /// Context built from the documents converted so far.
    pub fn context(&self) -> String {
        context::build(&self.pipeline.entries())
    }

    // ── Questions ────────────────────────────────────────────────────────

    /// Ask a question about the converted documents.
    ///
    /// See [`answer_question`] for how fragments and failures are handled.
    pub async fn ask<F>(&mut self, question: &str, on_fragment: F) -> Result<AnswerOutcome, Pdf2LlmError>
    where
        F: FnMut(&str),
    {
        let context = self.context();
        answer_question(
            &self.answers,
            &mut self.accumulator,
            &context,
            question,
            on_fragment,
        )
        .await
    }

    /// The current question and answer.
    pub fn answer(&self) -> &AnswerSession {
        self.accumulator.session()
    }

    /// The answer text exactly as accumulated, for copying.
    pub fn answer_text(&self) -> &str {
        self.accumulator.answer_text()
    }
}
