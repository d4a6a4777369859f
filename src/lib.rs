//! Three-Line Summary Service
//!
//! A small backend that:
//! - Forwards user text to Gemini for a three-line summary
//! - Keeps one shared, in-memory conversation history
//! - Serves the history and chat flow over HTTP
//!
//! FLOW:
//! REQUEST → APPEND(user) → SUMMARIZE → APPEND(assistant) → RESPOND

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod summarizer;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use memory::HistoryStore;
pub use summarizer::{GeminiClient, Summarizer};
