//! Resilient clients for the remote generation and speech services.
//!
//! This crate provides:
//! - A generic retrying call engine with exponential backoff and jitter
//! - A structured error taxonomy separating transient from fatal failures
//! - The generation client (file upload, readiness polling, JSON extraction)
//! - The speech-synthesis client and a lazily populated voice catalog

pub mod client;
pub mod error;
pub mod retry;
pub mod tts;
pub mod voices;

pub use client::{FileHandle, GenerationClient, PromptPart};
pub use error::{GenAiError, GenAiResult};
pub use retry::{call_with_retry, RetryConfig};
pub use tts::{TtsClient, Voice};
pub use voices::VoiceCatalog;
