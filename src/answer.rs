//! Answer sessions and the fragment accumulator.
//!
//! An [`AnswerSession`] is the state the UI renders for one question.
//! [`AnswerAccumulator`] owns the current session and is the only thing that
//! mutates it:
//!
//! * `start` replaces the previous session as a whole, never merging into it;
//! * `consume` appends while streaming, escaping newlines as the two
//!   characters `\n` to match the transport's line-delimited framing;
//! * `finish` freezes the text;
//! * `fail` replaces any partial text with a message and freezes it.
//!
//! Partial text is discarded on every failure, whether the stream could not
//! be opened or broke halfway.

use crate::error::Pdf2LlmError;
use serde::Serialize;
use tracing::warn;

/// One question and its (possibly still growing) answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerSession {
    pub question: String,
    pub is_streaming: bool,
    pub answer_text: String,
}

/// Builds the answer of the current session from streamed fragments.
#[derive(Debug, Default)]
pub struct AnswerAccumulator {
    session: AnswerSession,
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session for `question`, replacing the previous one.
    ///
    /// # Errors
    /// [`Pdf2LlmError::InvalidState`] while the current session is still
    /// streaming; only one question may be answered at a time.
    pub fn start(&mut self, question: impl Into<String>) -> Result<(), Pdf2LlmError> {
        if self.session.is_streaming {
            return Err(Pdf2LlmError::InvalidState(
                "an answer is still streaming; wait for it to finish".into(),
            ));
        }
        self.session = AnswerSession {
            question: question.into(),
            is_streaming: true,
            answer_text: String::new(),
        };
        Ok(())
    }

    /// Append a fragment, escaping each newline as `\n`.
    ///
    /// Ignored outside a streaming session so a finished answer stays final.
    pub fn consume(&mut self, fragment: &str) {
        if !self.session.is_streaming {
            warn!("Dropping fragment received outside a streaming session");
            return;
        }
        self.session.answer_text.push_str(&escape_newlines(fragment));
    }

    /// End the session successfully, keeping the text as is.
    pub fn finish(&mut self) {
        self.session.is_streaming = false;
    }

    /// End the session with `message` in place of any partial answer.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.session.answer_text = message.into();
        self.session.is_streaming = false;
    }

    pub fn session(&self) -> &AnswerSession {
        &self.session
    }

    pub fn is_streaming(&self) -> bool {
        self.session.is_streaming
    }

    /// Current answer text, unchanged; this is what a clipboard copy receives.
    pub fn answer_text(&self) -> &str {
        &self.session.answer_text
    }

    pub fn question(&self) -> &str {
        &self.session.question
    }
}

/// Replace every `\n` with the two-character sequence backslash, `n`.
pub fn escape_newlines(fragment: &str) -> String {
    fragment.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_accumulate_with_escaped_newlines() {
        let mut acc = AnswerAccumulator::new();
        acc.start("greeting?").unwrap();
        for fragment in ["Hel", "lo\n", "World"] {
            acc.consume(fragment);
        }
        assert!(acc.is_streaming());
        acc.finish();
        assert_eq!(acc.answer_text(), "Hello\\nWorld");
        assert!(!acc.answer_text().contains('\n'));
        assert!(!acc.is_streaming());
    }

    #[test]
    fn start_while_streaming_is_rejected_and_keeps_session() {
        let mut acc = AnswerAccumulator::new();
        acc.start("first").unwrap();
        acc.consume("partial");
        let err = acc.start("second").unwrap_err();
        assert!(matches!(err, Pdf2LlmError::InvalidState(_)));
        assert_eq!(acc.question(), "first");
        assert_eq!(acc.answer_text(), "partial");
        assert!(acc.is_streaming());
    }

    #[test]
    fn new_question_replaces_finished_session() {
        let mut acc = AnswerAccumulator::new();
        acc.start("first").unwrap();
        acc.consume("old answer");
        acc.finish();
        acc.start("second").unwrap();
        assert_eq!(
            acc.session(),
            &AnswerSession {
                question: "second".into(),
                is_streaming: true,
                answer_text: String::new(),
            }
        );
    }

    #[test]
    fn fail_discards_partial_text() {
        let mut acc = AnswerAccumulator::new();
        acc.start("q").unwrap();
        acc.consume("half an ans");
        acc.fail("Something went wrong");
        assert_eq!(acc.answer_text(), "Something went wrong");
        assert!(!acc.is_streaming());
    }

    #[test]
    fn finished_answer_is_final() {
        let mut acc = AnswerAccumulator::new();
        acc.start("q").unwrap();
        acc.consume("done");
        acc.finish();
        acc.consume(" more");
        assert_eq!(acc.answer_text(), "done");
    }

    #[test]
    fn escape_handles_multiple_newlines() {
        assert_eq!(escape_newlines("a\n\nb\n"), "a\\n\\nb\\n");
        assert_eq!(escape_newlines(""), "");
    }
}
