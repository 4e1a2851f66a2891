//! Input resolution: turn a user-supplied path or URL into a [`DocumentFile`].
//!
//! Local files are read whole; URLs are downloaded into memory. The first
//! bytes are checked for the `%PDF` magic so a wrong file is reported here,
//! with its path, rather than as an opaque OCR failure later. Empty files
//! pass through untouched: the pipeline records them as failed entries.

use crate::document::DocumentFile;
use crate::error::Pdf2LlmError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<DocumentFile, Pdf2LlmError> {
    if input.trim().is_empty() {
        return Err(Pdf2LlmError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Read a local file, validating existence and PDF magic bytes.
async fn read_local(path_str: &str) -> Result<DocumentFile, Pdf2LlmError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2LlmError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2LlmError::FileNotFound { path }),
    };

    check_magic(&path, &bytes)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(DocumentFile::new(file_name(&path), bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<DocumentFile, Pdf2LlmError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2LlmError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2LlmError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2LlmError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Pdf2LlmError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2LlmError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let name = url_file_name(url);
    check_magic(Path::new(&name), &bytes)?;
    info!("Downloaded {} ({} bytes)", name, bytes.len());
    Ok(DocumentFile::new(name, bytes.to_vec()))
}

/// Empty input passes; anything else must start with `%PDF`.
fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2LlmError> {
    if !bytes.is_empty() && !bytes.starts_with(b"%PDF") {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Pdf2LlmError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last URL path segment when it looks like a file name.
fn url_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(url_file_name("https://example.com/a/manual.pdf"), "manual.pdf");
        assert_eq!(url_file_name("https://arxiv.org/pdf/1706"), "downloaded.pdf");
        assert_eq!(url_file_name("https://example.com/"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn reads_local_pdf_with_file_name() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.7 body").unwrap();
        let path = tmp.path().to_string_lossy().to_string();

        let file = resolve_input(&path, 5).await.unwrap();
        assert!(file.name.ends_with(".pdf"));
        assert!(!file.name.contains('/'));
        assert_eq!(&*file.bytes, b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn empty_local_file_is_accepted() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_string_lossy().to_string();
        let file = resolve_input(&path, 5).await.unwrap();
        assert!(file.bytes.is_empty());
    }

    #[tokio::test]
    async fn rejects_non_pdf() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04zip").unwrap();
        let path = tmp.path().to_string_lossy().to_string();
        let err = resolve_input(&path, 5).await.unwrap_err();
        assert!(matches!(err, Pdf2LlmError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[tokio::test]
    async fn rejects_file_shorter_than_magic() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%P").unwrap();
        let path = tmp.path().to_string_lossy().to_string();
        let err = resolve_input(&path, 5).await.unwrap_err();
        assert!(matches!(err, Pdf2LlmError::NotAPdf { magic, .. } if &magic == b"%P\0\0"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/a/real/file.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2LlmError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2LlmError::InvalidInput { .. }));
    }
}
