//! The conversion pipeline: ordered document entries and their OCR runs.
//!
//! [`ConversionPipeline`] owns every [`DocumentEntry`]. Files are added as
//! `Pending`; [`ConversionPipeline::convert_all`] then walks the entries that
//! still need work, in upload order, and records each outcome on its entry.
//!
//! ## Failure isolation
//!
//! An OCR failure only ever changes the state of the entry it happened on.
//! The run continues with the next entry and `convert_all` itself succeeds;
//! callers inspect entry states (or the returned [`ConversionSummary`]) to
//! see what failed.
//!
//! ## Concurrency
//!
//! The entry list sits behind a mutex that is never held across an await, so
//! other tasks can take snapshots, add files or remove idle entries while a
//! run is in progress. OCR calls go out one at a time by default; raising
//! [`crate::config::ServiceConfig::concurrency`] lets several run at once
//! while outcomes are still recorded and reported in upload order.
//!
//! `is_converting` is true exactly while some entry is `Converting`: the
//! next entry is claimed in the same critical section that records the
//! previous one, and the flag drops with the last write.

use crate::config::ServiceConfig;
use crate::document::{ConversionState, DocumentEntry, DocumentFile, DocumentId};
use crate::error::Pdf2LlmError;
use crate::pipeline::ocr::OcrClient;
use crate::progress::ProgressCallback;
use crate::prompts::{page_header, CONVERSION_FAILED_MESSAGE};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Counts of entries per state at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionProgress {
    pub total: usize,
    pub pending: usize,
    pub converting: usize,
    pub converted: usize,
    pub failed: usize,
}

impl ConversionProgress {
    /// Share of entries in a terminal state, in `0.0..=1.0`. `1.0` when empty.
    pub fn fraction_done(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.converted + self.failed) as f64 / self.total as f64
        }
    }

    /// True when every entry is either converted or failed.
    pub fn is_complete(&self) -> bool {
        self.pending == 0 && self.converting == 0
    }
}

/// Outcome of one [`ConversionPipeline::convert_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    /// Entries this run sent to the OCR service.
    pub attempted: usize,
    pub converted: usize,
    pub failed: usize,
    /// Entries left alone because they were already converted.
    pub skipped: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct ConversionSession {
    entries: Vec<DocumentEntry>,
    is_converting: bool,
    next_id: u64,
}

impl ConversionSession {
    fn entry_mut(&mut self, id: DocumentId) -> Option<&mut DocumentEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Mark the earliest entry still present among `remaining` as
    /// `Converting`, so the run never shows a gap between two entries.
    fn claim_next(&mut self, remaining: &[DocumentId]) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| remaining.contains(&e.id))
        {
            if entry.state.needs_conversion() {
                entry.state = ConversionState::Converting;
            }
        }
    }

    /// `is_converting` holds iff some entry is `Converting`.
    fn refresh_flag(&mut self) {
        self.is_converting = self.entries.iter().any(|e| e.state.is_converting());
    }
}

enum EntryOutcome {
    Converted {
        id: DocumentId,
        name: String,
        markdown: String,
    },
    Failed {
        id: DocumentId,
        name: String,
        detail: String,
    },
    /// Removed by the user before its turn came.
    Removed,
}

impl EntryOutcome {
    /// The final state to record, with the entry it belongs to.
    fn final_state(&self) -> Option<(DocumentId, ConversionState)> {
        match self {
            Self::Converted { id, markdown, .. } => Some((
                *id,
                ConversionState::Converted {
                    markdown: markdown.clone(),
                },
            )),
            Self::Failed { id, detail, .. } => Some((
                *id,
                ConversionState::Failed {
                    message: CONVERSION_FAILED_MESSAGE.to_string(),
                    detail: detail.clone(),
                },
            )),
            Self::Removed => None,
        }
    }
}

/// Owns the document entries and converts them through an [`OcrClient`].
pub struct ConversionPipeline {
    ocr: OcrClient,
    concurrency: usize,
    progress: Option<ProgressCallback>,
    session: Mutex<ConversionSession>,
}

impl ConversionPipeline {
    pub fn new(ocr: OcrClient, config: &ServiceConfig) -> Self {
        Self {
            ocr,
            concurrency: config.concurrency.max(1),
            progress: None,
            session: Mutex::new(ConversionSession::default()),
        }
    }

    /// Receive per-entry events during runs.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ConversionSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Entry management ─────────────────────────────────────────────────

    /// Append files as `Pending` entries, keeping their order.
    ///
    /// Does not start conversion. Files added during a run wait for the next
    /// run.
    pub fn add_files(&self, files: impl IntoIterator<Item = DocumentFile>) -> Vec<DocumentId> {
        let mut session = self.lock();
        let mut ids = Vec::new();
        for file in files {
            let id = DocumentId(session.next_id);
            session.next_id += 1;
            debug!("Added document {} '{}' ({} bytes)", id, file.name, file.bytes.len());
            session.entries.push(DocumentEntry {
                id,
                file,
                state: ConversionState::Pending,
            });
            ids.push(id);
        }
        ids
    }

    /// Remove an entry and return it.
    ///
    /// # Errors
    /// * [`Pdf2LlmError::InvalidState`] while the entry is being converted.
    /// * [`Pdf2LlmError::DocumentNotFound`] for an unknown id.
    pub fn remove_file(&self, id: DocumentId) -> Result<DocumentEntry, Pdf2LlmError> {
        let mut session = self.lock();
        let pos = session
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(Pdf2LlmError::DocumentNotFound { id })?;
        if session.entries[pos].state.is_converting() {
            return Err(Pdf2LlmError::InvalidState(format!(
                "document '{}' is being converted and cannot be removed",
                session.entries[pos].name()
            )));
        }
        let entry = session.entries.remove(pos);
        debug!("Removed document {} '{}'", id, entry.name());
        Ok(entry)
    }

    /// Drop every entry.
    ///
    /// # Errors
    /// [`Pdf2LlmError::InvalidState`] while a run is in progress.
    pub fn reset(&self) -> Result<(), Pdf2LlmError> {
        let mut session = self.lock();
        if session.is_converting {
            return Err(Pdf2LlmError::InvalidState(
                "cannot reset while documents are being converted".into(),
            ));
        }
        session.entries.clear();
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Snapshot of every entry in upload order.
    pub fn entries(&self) -> Vec<DocumentEntry> {
        self.lock().entries.clone()
    }

    pub fn entry(&self, id: DocumentId) -> Option<DocumentEntry> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// True while some entry is `Converting`.
    pub fn is_converting(&self) -> bool {
        self.lock().is_converting
    }

    pub fn progress(&self) -> ConversionProgress {
        let session = self.lock();
        let mut p = ConversionProgress {
            total: session.entries.len(),
            ..Default::default()
        };
        for entry in &session.entries {
            match entry.state {
                ConversionState::Pending => p.pending += 1,
                ConversionState::Converting => p.converting += 1,
                ConversionState::Converted { .. } => p.converted += 1,
                ConversionState::Failed { .. } => p.failed += 1,
            }
        }
        p
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Convert every entry that is not yet `Converted`, in upload order.
    ///
    /// Pending entries and entries that failed in an earlier run are
    /// attempted; converted ones are skipped. Each entry ends the run as
    /// `Converted` (pages labelled `=== Page n°k ===` and separated by a blank
    /// line) or `Failed` with a fixed user-facing message.
    ///
    /// Final states are recorded in upload order, whatever order the OCR
    /// calls finish in. When an entry is recorded the next one is already
    /// marked `Converting`, and the converting flag drops together with the
    /// last state write, before `on_conversion_complete` fires.
    ///
    /// # Errors
    /// Only [`Pdf2LlmError::InvalidState`] when another run is in progress.
    /// OCR failures are recorded on their entries, never returned.
    pub async fn convert_all(&self) -> Result<ConversionSummary, Pdf2LlmError> {
        let start = Instant::now();

        let (targets, ids, skipped) = {
            let mut session = self.lock();
            if session.is_converting {
                return Err(Pdf2LlmError::InvalidState(
                    "a conversion run is already in progress".into(),
                ));
            }
            let targets: Vec<(DocumentId, DocumentFile)> = session
                .entries
                .iter()
                .filter(|e| e.state.needs_conversion())
                .map(|e| (e.id, e.file.clone()))
                .collect();
            let ids: Vec<DocumentId> = targets.iter().map(|(id, _)| *id).collect();
            let skipped = session.entries.len() - targets.len();
            session.claim_next(&ids);
            session.refresh_flag();
            (targets, ids, skipped)
        };
        let _run = RunGuard {
            session: &self.session,
            ids: &ids,
        };

        info!(
            "Converting {} documents ({} already converted)",
            targets.len(),
            skipped
        );
        if let Some(ref cb) = self.progress {
            cb.on_conversion_start(targets.len());
        }

        let mut summary = ConversionSummary {
            skipped,
            ..Default::default()
        };

        // `buffered` starts entries in order and yields outcomes in order.
        let mut outcomes = stream::iter(targets)
            .map(|(id, file)| self.convert_entry(id, file))
            .buffered(self.concurrency);

        let mut done = 0;
        while let Some(outcome) = outcomes.next().await {
            done += 1;
            {
                let mut session = self.lock();
                if let Some((id, state)) = outcome.final_state() {
                    if let Some(entry) = session.entry_mut(id) {
                        entry.state = state;
                    }
                }
                session.claim_next(&ids[done..]);
                session.refresh_flag();
            }

            match outcome {
                EntryOutcome::Converted { id, name, markdown } => {
                    summary.attempted += 1;
                    summary.converted += 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_entry_complete(id, &name, markdown.len());
                    }
                }
                EntryOutcome::Failed { id, name, detail } => {
                    summary.attempted += 1;
                    summary.failed += 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_entry_error(id, &name, &detail);
                    }
                }
                EntryOutcome::Removed => {}
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Conversion complete: {}/{} documents in {}ms",
            summary.converted, summary.attempted, summary.duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_conversion_complete(summary.attempted, summary.converted);
        }
        Ok(summary)
    }

    /// Run OCR for one entry. The final state is left to the caller, which
    /// records outcomes in upload order.
    async fn convert_entry(&self, id: DocumentId, file: DocumentFile) -> EntryOutcome {
        {
            let mut session = self.lock();
            match session.entry_mut(id) {
                Some(entry) => entry.state = ConversionState::Converting,
                None => {
                    debug!("Document {} was removed before conversion", id);
                    return EntryOutcome::Removed;
                }
            }
            session.refresh_flag();
        }
        if let Some(ref cb) = self.progress {
            cb.on_entry_start(id, &file.name);
        }

        let started = Instant::now();
        match self.ocr.convert(&file.bytes).await {
            Ok(pages) => {
                let markdown = join_pages(&pages);
                debug!(
                    "Document '{}': {} pages, {} bytes in {:?}",
                    file.name,
                    pages.len(),
                    markdown.len(),
                    started.elapsed()
                );
                EntryOutcome::Converted {
                    id,
                    name: file.name,
                    markdown,
                }
            }
            Err(e) => {
                let detail = e.to_string();
                warn!("Document '{}' failed: {}", file.name, detail);
                EntryOutcome::Failed {
                    id,
                    name: file.name,
                    detail,
                }
            }
        }
    }
}

/// Returns this run's interrupted entries to `Pending` when the run's future
/// is dropped mid-flight. A completed run has nothing left to revert.
struct RunGuard<'a> {
    session: &'a Mutex<ConversionSession>,
    ids: &'a [DocumentId],
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in session.entries.iter_mut() {
            if entry.state.is_converting() && self.ids.contains(&entry.id) {
                entry.state = ConversionState::Pending;
            }
        }
        session.refresh_flag();
    }
}

/// Label and join OCR pages: `=== Page n°k ===` headers, blank-line separated.
///
/// No pages gives an empty string.
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, markdown)| format!("{}\n{}", page_header(i + 1), markdown))
        .collect::<Vec<_>>()
        .join("\n\n")
}
