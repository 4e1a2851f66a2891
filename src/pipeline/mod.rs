//! Stages that talk to the outside world.
//!
//! Each submodule implements exactly one step, so each can be tested with a
//! fake transport and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ ocr ──────────▶ (pipeline: convert.rs)
//! (path/URL) (base64)  (OCR service)
//!
//! (context.rs) ──▶ completion ──▶ sse ──▶ fragments
//!                  (agent call)   (framing)
//! ```
//!
//! 1. [`input`]      : read a local path or download a URL into memory
//! 2. [`encode`]     : wrap document bytes as a base64 `data:` URI
//! 3. [`ocr`]        : one OCR call per document, pages in order
//! 4. [`completion`] : one streaming agent call per question
//! 5. [`sse`]        : split the stream body into events and text deltas
//! 6. [`transport`]  : wire types, transport traits and the HTTPS transport

pub mod completion;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod sse;
pub mod transport;
