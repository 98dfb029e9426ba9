//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one transformation step, so every
//! stage is testable without the ones around it.
//!
//! ## Data Flow
//!
//! ```text
//! detect ──▶ extract ──▶ (prompts) ──▶ llm ──▶ postprocess
//! (type)     (normalize)   (text)     (model)   (JSON cleanup)
//! ```
//!
//! 1. [`detect`]: pick JSON / image / PDF from the declared type or the
//!    payload itself
//! 2. [`extract`]: parse the payload into a [`crate::document::NormalizedDocument`];
//!    [`image`] and [`pdf`] run in `spawn_blocking`, with [`decode`] handling
//!    base64 and data URLs for both
//! 3. [`llm`]: select provider and model, call it; the only stage with
//!    network I/O
//! 4. [`postprocess`]: pull the JSON object out of the raw completion
//!    before it is deserialized

pub mod decode;
pub mod detect;
pub mod extract;
pub mod image;
pub mod llm;
pub mod pdf;
pub mod postprocess;
