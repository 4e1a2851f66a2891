//! Document encoding: raw PDF bytes → base64 `data:` URI.
//!
//! The OCR endpoint accepts documents inline as a data URI in the JSON body,
//! so no upload step or temporary storage is needed.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// MIME type declared for every submitted document.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Wrap raw document bytes as `data:application/pdf;base64,<payload>`.
pub fn pdf_data_uri(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded document → {} bytes base64", b64.len());
    format!("data:{PDF_MIME_TYPE};base64,{b64}")
}
