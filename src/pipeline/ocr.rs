//! OCR client: raw document bytes → ordered page markdown.
//!
//! Empty input is refused before touching the network. Otherwise the
//! document is sent in one request and the returned pages are put in order.
//! Labelling and joining pages is the pipeline's job.

use crate::config::ServiceConfig;
use crate::error::Pdf2LlmError;
use crate::pipeline::encode::pdf_data_uri;
use crate::pipeline::transport::{OcrDocument, OcrRequest, OcrTransport};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Converts documents to per-page markdown through an [`OcrTransport`].
#[derive(Clone)]
pub struct OcrClient {
    transport: Arc<dyn OcrTransport>,
    model: String,
}

impl OcrClient {
    pub fn new(transport: Arc<dyn OcrTransport>, config: &ServiceConfig) -> Self {
        Self {
            transport,
            model: config.ocr_model.clone(),
        }
    }

    /// Recognise every page of `bytes`, in page order.
    ///
    /// # Errors
    /// * [`Pdf2LlmError::EmptyDocument`] for 0-byte input, without any request.
    /// * [`Pdf2LlmError::OcrService`] for network or service failures.
    ///
    /// A document the service reads as having no pages yields `Ok(vec![])`.
    pub async fn convert(&self, bytes: &[u8]) -> Result<Vec<String>, Pdf2LlmError> {
        if bytes.is_empty() {
            return Err(Pdf2LlmError::EmptyDocument);
        }

        let start = Instant::now();
        let request = OcrRequest {
            model: self.model.clone(),
            document: OcrDocument::DocumentUrl {
                document_url: pdf_data_uri(bytes),
            },
        };

        let mut response = self.transport.process(&request).await?;

        // Stable: unindexed pages go last, in response order.
        response
            .pages
            .sort_by_key(|p| p.index.unwrap_or(usize::MAX));

        debug!(
            "OCR returned {} pages in {:?}",
            response.pages.len(),
            start.elapsed()
        );
        Ok(response.pages.into_iter().map(|p| p.markdown).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::transport::{OcrPage, OcrResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeOcr {
        calls: AtomicUsize,
        last_request: Mutex<Option<OcrRequest>>,
        pages: Vec<OcrPage>,
    }

    impl FakeOcr {
        fn with_pages(pages: Vec<OcrPage>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
                pages,
            })
        }
    }

    #[async_trait]
    impl OcrTransport for FakeOcr {
        async fn process(&self, request: &OcrRequest) -> Result<OcrResponse, Pdf2LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(OcrResponse {
                pages: self.pages.clone(),
            })
        }
    }

    fn page(index: Option<usize>, markdown: &str) -> OcrPage {
        OcrPage {
            index,
            markdown: markdown.to_string(),
        }
    }

    fn client(fake: &Arc<FakeOcr>) -> OcrClient {
        let transport: Arc<dyn OcrTransport> = fake.clone();
        OcrClient::new(transport, &ServiceConfig::default())
    }

    #[tokio::test]
    async fn empty_input_fails_without_network_call() {
        let fake = FakeOcr::with_pages(vec![page(Some(0), "never")]);
        let err = client(&fake).convert(&[]).await.unwrap_err();
        assert!(matches!(err, Pdf2LlmError::EmptyDocument));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_pages_is_empty_success() {
        let fake = FakeOcr::with_pages(vec![]);
        let pages = client(&fake).convert(b"%PDF").await.unwrap();
        assert!(pages.is_empty());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pages_are_ordered_by_index() {
        let fake = FakeOcr::with_pages(vec![
            page(Some(2), "third"),
            page(Some(0), "first"),
            page(Some(1), "second"),
        ]);
        let pages = client(&fake).convert(b"%PDF").await.unwrap();
        assert_eq!(pages, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn request_carries_model_and_data_uri() {
        let fake = FakeOcr::with_pages(vec![page(None, "x")]);
        client(&fake).convert(b"%PDF-1.7").await.unwrap();
        let req = fake.last_request.lock().unwrap().clone().expect("request");
        assert_eq!(req.model, "mistral-ocr-latest");
        let OcrDocument::DocumentUrl { document_url } = req.document;
        assert!(document_url.starts_with("data:application/pdf;base64,"));
    }
}
