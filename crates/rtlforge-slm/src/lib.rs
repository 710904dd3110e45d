//! rtlforge-slm: generation adapter for small-language-model HTTP endpoints
//!
//! Implements the core [`Generator`](rtlforge_core::Generator) trait. All
//! response-format probing happens here; the engine only ever sees text or a
//! structured failure.

pub mod client;
pub mod error;

pub use client::{response_text, SlmClient, SlmConfig, TEXT_FIELDS};
pub use error::SlmError;
