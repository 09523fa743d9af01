//! Mock MFA prompt for testing.

use crate::error::MfaPromptError;
use crate::mfa::MfaPrompt;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock prompt answering a fixed code, or failing.
pub struct MockPrompt {
    answer: Option<String>,
    calls: AtomicUsize,
    last_message: Mutex<Option<String>>,
}

impl MockPrompt {
    /// A prompt that answers `code`.
    pub fn answering(code: impl Into<String>) -> Self {
        Self {
            answer: Some(code.into()),
            calls: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        }
    }

    /// A prompt the user cancels.
    pub fn cancelling() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        }
    }

    /// Number of times the prompt was shown.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The last message shown.
    pub fn last_message(&self) -> Option<String> {
        self.last_message.lock().unwrap().clone()
    }
}

#[async_trait]
impl MfaPrompt for MockPrompt {
    async fn prompt(&self, message: &str) -> Result<String, MfaPromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_message.lock().unwrap() = Some(message.to_string());
        self.answer.clone().ok_or(MfaPromptError::Cancelled)
    }
}
