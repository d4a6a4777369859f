//! Summarizer trait and implementations
//!
//! The summarization gateway turns user text into a three-line summary.
//! Handlers only see the trait, so the hosted LLM can be swapped for a stub.

use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiClient;

/// Instruction sent with every summarization request
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes user provided text. \
Return the summary in exactly three lines. Each line should be concise \
and capture a key aspect of the input. 한국어로 답하라.";

/// Trait for text summarization (LLM controlled)
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`, returning the trimmed summary
    async fn summarize(&self, text: &str) -> Result<String>;
}
