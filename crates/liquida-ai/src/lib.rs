//! External extraction layer: the Gemini `generateContent` call, its prompt
//! and response schema, and the quota-aware retry wrapper around it.

mod client;
mod error;
pub mod prompt;
pub mod retry;
pub mod schema;

pub use client::{DEFAULT_API_BASE, ExtractionRequest, Extractor, GeminiClient, ModelVariant};
pub use error::ExtractError;
pub use retry::{RetryPolicy, with_retry};
