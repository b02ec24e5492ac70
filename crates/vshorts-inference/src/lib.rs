//! Inference plumbing for timecode extraction.
//!
//! Provides the [`InferenceClient`] seam with a process-backed implementation
//! (`ollama run <model>` by default), the [`PromptBuilder`] and the
//! audio popularity-analysis client.

pub mod client;
pub mod error;
pub mod popularity;
pub mod prompt;

pub use client::{InferenceClient, ProcessClientConfig, ProcessInferenceClient};
pub use error::{InferenceError, InferenceResult};
pub use popularity::{PopularityClient, PopularityClientConfig};
pub use prompt::PromptBuilder;
