//! Streaming answer client: (context, question) → fragment stream.
//!
//! [`StreamingAnswerClient::ask`] opens one streaming completion against the
//! configured agent and hands back a [`FragmentStream`]. The stream is lazy
//! (nothing is read until polled), finite (it ends on `[DONE]` or end of
//! body) and cannot be restarted: it owns the response body.
//!
//! Fragments may be empty. Consumers skip them; only the end of the stream
//! means the answer is complete. A transport or decoding failure is yielded
//! as a single `Err` item after every fragment decoded before it, and the
//! stream ends right after.

use crate::config::ServiceConfig;
use crate::error::Pdf2LlmError;
use crate::pipeline::sse::{parse_delta, SseDecoder, SseEvent};
use crate::pipeline::transport::{
    AgentCompletionRequest, ByteStream, ChatMessage, CompletionTransport,
};
use crate::prompts::answer_prompt;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of answer fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, Pdf2LlmError>> + Send>>;

/// Asks questions to the configured agent through a [`CompletionTransport`].
#[derive(Clone)]
pub struct StreamingAnswerClient {
    transport: Arc<dyn CompletionTransport>,
    agent_id: String,
}

impl StreamingAnswerClient {
    pub fn new(transport: Arc<dyn CompletionTransport>, config: &ServiceConfig) -> Self {
        Self {
            transport,
            agent_id: config.agent_id.clone(),
        }
    }

    /// The request sent for a question: one system message holding the
    /// instruction template with the question and context embedded verbatim.
    pub fn build_request(&self, context: &str, question: &str) -> AgentCompletionRequest {
        AgentCompletionRequest {
            agent_id: self.agent_id.clone(),
            messages: vec![ChatMessage::system(answer_prompt(context, question))],
            stream: true,
        }
    }

    /// Open a streaming answer.
    ///
    /// # Errors
    /// [`Pdf2LlmError::AnswerService`] when the call cannot be set up. Later
    /// failures arrive as an `Err` item inside the stream.
    pub async fn ask(&self, context: &str, question: &str) -> Result<FragmentStream, Pdf2LlmError> {
        info!(
            "Asking agent {} ({} chars of context)",
            self.agent_id,
            context.len()
        );
        let request = self.build_request(context, question);
        let body = self.transport.open_stream(&request).await?;
        Ok(fragments(body))
    }
}

/// Decode a raw completion body into fragments.
pub fn fragments(body: ByteStream) -> FragmentStream {
    let state = FragmentState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        error: None,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(fragment) = st.pending.pop_front() {
                return Some((Ok(fragment), st));
            }
            if let Some(err) = st.error.take() {
                return Some((Err(err), st));
            }
            if st.finished {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(&chunk);
                    st.absorb(events);
                }
                Some(Err(err)) => {
                    st.error = Some(err);
                    st.finished = true;
                }
                None => {
                    let tail = st.decoder.finish();
                    st.absorb(tail);
                    st.finished = true;
                }
            }
        }
    }))
}

struct FragmentState {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    error: Option<Pdf2LlmError>,
    finished: bool,
}

impl FragmentState {
    fn absorb(&mut self, events: impl IntoIterator<Item = SseEvent>) {
        for event in events {
            if self.finished {
                return;
            }
            match event {
                SseEvent::Done => {
                    debug!("Answer stream reached [DONE]");
                    self.finished = true;
                }
                SseEvent::Data(data) => match parse_delta(&data) {
                    Ok(Some(fragment)) => self.pending.push_back(fragment),
                    Ok(None) => {}
                    Err(err) => {
                        self.error = Some(err);
                        self.finished = true;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn body(chunks: Vec<Result<&'static str, Pdf2LlmError>>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<String, Pdf2LlmError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn yields_each_delta_including_empty_ones() {
        let items = collect(fragments(body(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n"),
            Ok("data: [DONE]\n\n"),
        ])))
        .await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["", "Hel", "lo"]);
    }

    #[tokio::test]
    async fn ignores_everything_after_done() {
        let items = collect(fragments(body(vec![Ok(
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
        )])))
        .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_deref().unwrap(), "a");
    }

    #[tokio::test]
    async fn ends_without_done_marker() {
        let items = collect(fragments(body(vec![Ok(
            "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        )])))
        .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_deref().unwrap(), "tail");
    }

    #[tokio::test]
    async fn mid_stream_error_comes_after_decoded_fragments() {
        let items = collect(fragments(body(vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n"),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"tial\"}}]}\n\n"),
            Err(Pdf2LlmError::answer("connection reset")),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n"),
        ])))
        .await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_deref().unwrap(), "par");
        assert_eq!(items[1].as_deref().unwrap(), "tial");
        assert!(matches!(items[2], Err(Pdf2LlmError::AnswerService { .. })));
    }

    #[tokio::test]
    async fn malformed_event_ends_stream_with_error() {
        let items = collect(fragments(body(vec![Ok(
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: {oops\n\n",
        )])))
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "ok");
        assert!(items[1].is_err());
    }

    #[test]
    fn request_is_single_system_message() {
        struct Unused;
        #[async_trait::async_trait]
        impl CompletionTransport for Unused {
            async fn open_stream(
                &self,
                _request: &AgentCompletionRequest,
            ) -> Result<ByteStream, Pdf2LlmError> {
                unreachable!()
            }
        }

        let config = ServiceConfig::builder()
            .api_key("k")
            .agent_id("ag:42")
            .build()
            .unwrap();
        let client = StreamingAnswerClient::new(Arc::new(Unused), &config);
        let req = client.build_request("CONTEXT", "Quelle est la garantie ?");
        assert_eq!(req.agent_id, "ag:42");
        assert!(req.stream);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "system");
        assert!(req.messages[0].content.contains("Quelle est la garantie ?"));
        assert!(req.messages[0].content.ends_with("CONTEXT"));
    }
}
