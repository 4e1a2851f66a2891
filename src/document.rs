//! Document entries and their conversion state machine.
//!
//! Each uploaded file becomes a [`DocumentEntry`] keyed by a [`DocumentId`].
//! Its [`ConversionState`] is an explicit tagged variant rather than a pair of
//! loosely related fields, so a `Converted` entry always carries markdown and
//! a `Failed` entry always carries its user-facing message.
//!
//! ```text
//! Pending ──▶ Converting ──▶ Converted { markdown }
//!    ▲             │
//!    │             └──────▶ Failed { message, detail }
//!    └───── retry on next run ───┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of an entry, unique within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-supplied file: display name plus raw bytes.
///
/// Bytes are reference-counted so snapshots of the pipeline stay cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::from(bytes.into()),
        }
    }
}

impl fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Where an entry is in its conversion lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversionState {
    /// Added, not yet attempted (or reverted after an interrupted run).
    Pending,
    /// An OCR call for this entry is in flight.
    Converting,
    /// OCR succeeded. `markdown` may be empty when the service found no pages.
    Converted { markdown: String },
    /// OCR failed. `message` is shown to the user, `detail` is the cause.
    Failed { message: String, detail: String },
}

impl ConversionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_converting(&self) -> bool {
        matches!(self, Self::Converting)
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the next pipeline run should attempt this entry.
    ///
    /// Failed entries are retried; converted ones are left alone.
    pub fn needs_conversion(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed { .. })
    }

    /// Short lowercase label for logs and terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Converting => "converting",
            Self::Converted { .. } => "converted",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One user-submitted document tracked through its conversion lifecycle.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub id: DocumentId,
    pub file: DocumentFile,
    pub state: ConversionState,
}

impl DocumentEntry {
    pub fn name(&self) -> &str {
        &self.file.name
    }

    /// The text to show for this entry.
    ///
    /// Converted markdown when converted, the failure message when failed,
    /// `None` while the entry is pending or converting.
    pub fn markdown_content(&self) -> Option<&str> {
        match &self.state {
            ConversionState::Converted { markdown } => Some(markdown),
            ConversionState::Failed { message, .. } => Some(message),
            ConversionState::Pending | ConversionState::Converting => None,
        }
    }

    /// Converted markdown only; `None` for every other state.
    pub fn converted_markdown(&self) -> Option<&str> {
        match &self.state {
            ConversionState::Converted { markdown } => Some(markdown),
            _ => None,
        }
    }
}

/// Serialisable view of an entry without its raw bytes, for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub id: DocumentId,
    pub name: String,
    pub size_bytes: usize,
    #[serde(flatten)]
    pub state: ConversionState,
}

impl From<&DocumentEntry> for EntrySummary {
    fn from(entry: &DocumentEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.file.name.clone(),
            size_bytes: entry.file.bytes.len(),
            state: entry.state.clone(),
        }
    }
}
