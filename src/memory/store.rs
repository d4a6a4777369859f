//! Shared conversation history
//!
//! One ordered, append-only list of messages for the whole process.
//! Every operation takes the same lock, so readers never see a half-applied
//! update and concurrent appends are never lost.

use crate::models::Message;
use tokio::sync::Mutex;

/// Process-wide chat history guarded by a mutex
#[derive(Debug, Default)]
pub struct HistoryStore {
    messages: Mutex<Vec<Message>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the end of the history
    pub async fn append(&self, message: Message) {
        self.messages.lock().await.push(message);
    }

    /// Independent copy of the current history
    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Clear history
    pub async fn reset(&self) {
        self.messages.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}
