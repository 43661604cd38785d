//! Continuation token tracking
//!
//! The backend hands out an opaque checkpoint id that lets it resume the
//! conversation on the next turn. Only forward continuation is supported: the
//! latest checkpoint always wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque checkpoint identifier issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Holds the token for one conversation thread
#[derive(Debug, Clone, Default)]
pub struct ContinuationTracker {
    token: Option<ContinuationToken>,
}

impl ContinuationTracker {
    /// Tracker for a brand new thread; the first request starts one server-side
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker resuming an existing thread, whose id doubles as its checkpoint
    pub fn resume(thread_id: impl Into<String>) -> Self {
        Self {
            token: Some(ContinuationToken::new(thread_id)),
        }
    }

    /// Record a checkpoint observed on the stream
    pub fn observe_checkpoint(&mut self, token: ContinuationToken) {
        if self.token.as_ref() != Some(&token) {
            tracing::debug!(checkpoint_id = %token, "Continuation token updated");
        }
        self.token = Some(token);
    }

    pub fn current(&self) -> Option<&ContinuationToken> {
        self.token.as_ref()
    }
}
