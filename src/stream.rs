//! Streaming question answering: drive one fragment stream into the
//! accumulator.
//!
//! [`answer_question`] ties [`StreamingAnswerClient`] to
//! [`AnswerAccumulator`]. It starts a session, feeds every non-empty fragment
//! to the accumulator as it arrives, and closes the session with `finish` or,
//! on any service failure, with `fail` and a fixed message. Whatever happens
//! remotely, the session is never left streaming when this returns.

use crate::answer::AnswerAccumulator;
use crate::error::Pdf2LlmError;
use crate::pipeline::completion::StreamingAnswerClient;
use crate::prompts::ANSWER_FAILED_MESSAGE;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

/// How a question ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The stream ended normally; `fragments` non-empty fragments were consumed.
    Completed { fragments: usize },
    /// The service failed; the session shows the failure message.
    Failed { detail: String },
}

/// Answer `question` against `context`, streaming into `accumulator`.
///
/// `on_fragment` sees each non-empty fragment raw (newlines unescaped) right
/// after it was consumed, for live display.
///
/// # Errors
/// Only [`Pdf2LlmError::InvalidState`] when the accumulator is already
/// streaming. Service failures are reported as [`AnswerOutcome::Failed`].
pub async fn answer_question<F>(
    client: &StreamingAnswerClient,
    accumulator: &mut AnswerAccumulator,
    context: &str,
    question: &str,
    mut on_fragment: F,
) -> Result<AnswerOutcome, Pdf2LlmError>
where
    F: FnMut(&str),
{
    accumulator.start(question)?;
    if context.is_empty() {
        warn!("Asking without any converted document in context");
    }

    let mut stream = match client.ask(context, question).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Answer stream could not be opened: {}", e);
            accumulator.fail(ANSWER_FAILED_MESSAGE);
            return Ok(AnswerOutcome::Failed {
                detail: e.to_string(),
            });
        }
    };

    let mut fragments = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) if fragment.is_empty() => continue,
            Ok(fragment) => {
                accumulator.consume(&fragment);
                fragments += 1;
                on_fragment(&fragment);
            }
            Err(e) => {
                warn!("Answer stream failed after {} fragments: {}", fragments, e);
                accumulator.fail(ANSWER_FAILED_MESSAGE);
                return Ok(AnswerOutcome::Failed {
                    detail: e.to_string(),
                });
            }
        }
    }

    accumulator.finish();
    debug!("Answer text: {} bytes", accumulator.answer_text().len());
    info!("Answer complete ({} fragments)", fragments);
    Ok(AnswerOutcome::Completed { fragments })
}
