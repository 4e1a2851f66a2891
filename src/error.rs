//! Error types for the pdf2llm library.
//!
//! A single enum, [`Pdf2LlmError`], covers every failure the core can report.
//! Not every variant reaches the caller the same way:
//!
//! * OCR failures ([`Pdf2LlmError::EmptyDocument`], [`Pdf2LlmError::OcrService`])
//!   raised while a pipeline run converts an entry are caught and recorded as
//!   that entry's `Failed` state. They never abort the run.
//!
//! * Answer failures ([`Pdf2LlmError::AnswerService`]) are turned into the
//!   accumulator's terminal message by [`crate::stream::answer_question`].
//!
//! * Everything else is fatal to the single operation it occurs in and is
//!   returned as `Err(Pdf2LlmError)`.

use crate::document::DocumentId;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2llm library.
#[derive(Debug, Error)]
pub enum Pdf2LlmError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The document has no bytes to send.
    #[error("No PDF content to process: the document is empty")]
    EmptyDocument,

    /// The OCR service could not be reached or rejected the document.
    #[error("OCR service error{}: {message}", status_suffix(.status))]
    OcrService {
        status: Option<u16>,
        message: String,
    },

    // ── Answer errors ─────────────────────────────────────────────────────
    /// The completion service failed before or during streaming.
    #[error("Answer service error{}: {message}", status_suffix(.status))]
    AnswerService {
        status: Option<u16>,
        message: String,
    },

    // ── State errors ──────────────────────────────────────────────────────
    /// The operation is not allowed while an entry or session is busy.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No entry with this id exists in the pipeline.
    #[error("No document with id {id}")]
    DocumentNotFound { id: DocumentId },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Missing or invalid credentials, identifiers or limits.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2LlmError {
    pub(crate) fn ocr(message: impl Into<String>) -> Self {
        Self::OcrService {
            status: None,
            message: message.into(),
        }
    }

    pub(crate) fn answer(message: impl Into<String>) -> Self {
        Self::AnswerService {
            status: None,
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_error_display_with_status() {
        let e = Pdf2LlmError::OcrService {
            status: Some(422),
            message: "unsupported document".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 422"), "got: {msg}");
        assert!(msg.contains("unsupported document"));
    }

    #[test]
    fn answer_error_display_without_status() {
        let e = Pdf2LlmError::answer("connection reset");
        let msg = e.to_string();
        assert!(!msg.contains("HTTP"), "got: {msg}");
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn document_not_found_display() {
        let e = Pdf2LlmError::DocumentNotFound { id: DocumentId(7) };
        assert!(e.to_string().contains('7'));
    }
}
