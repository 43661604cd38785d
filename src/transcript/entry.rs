//! Transcript entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque entry identifier, never reused within a transcript
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Mint a fresh identifier for a locally created entry
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

/// Where an entry is in its life
///
/// `Pending` and `Streaming` are in flight; `Complete` and `Failed` are final
/// and the entry no longer changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Pending,
    Streaming,
    Complete,
    Failed,
}

impl Lifecycle {
    pub fn is_final(self) -> bool {
        matches!(self, Lifecycle::Complete | Lifecycle::Failed)
    }
}

/// One phase of the assistant's use of the search tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Searching,
    Reading,
    Writing,
    Error,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Searching => "searching",
            Stage::Reading => "reading",
            Stage::Writing => "writing",
            Stage::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trace of the search tool's activity during one assistant turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolActivity {
    /// Append-only; never holds the same stage twice in a row
    pub stages: Vec<Stage>,
    /// Set with the first stage and kept for the rest of the turn
    pub query: String,
    /// Replaced wholesale whenever new results arrive
    pub result_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ToolActivity {
    pub fn new(first_stage: Stage, query: impl Into<String>) -> Self {
        Self {
            stages: vec![first_stage],
            query: query.into(),
            result_refs: Vec::new(),
            error_detail: None,
        }
    }

    /// Append a stage unless it is already the latest one.
    ///
    /// Returns whether the stage was appended.
    pub fn push_stage(&mut self, stage: Stage) -> bool {
        if self.stages.last() == Some(&stage) {
            return false;
        }
        self.stages.push(stage);
        true
    }
}

/// A single message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub author: Author,
    pub text: String,
    pub lifecycle: Lifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_activity: Option<ToolActivity>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// A finished entry with the given text
    pub fn complete(id: EntryId, author: Author, text: impl Into<String>) -> Self {
        Self {
            id,
            author,
            text: text.into(),
            lifecycle: Lifecycle::Complete,
            tool_activity: None,
            created_at: Utc::now(),
        }
    }

    /// The user's side of a turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::complete(EntryId::generate(), Author::User, text)
    }

    /// Empty assistant entry awaiting the first streamed event
    pub fn assistant_placeholder() -> Self {
        Self {
            id: EntryId::generate(),
            author: Author::Assistant,
            text: String::new(),
            lifecycle: Lifecycle::Pending,
            tool_activity: None,
            created_at: Utc::now(),
        }
    }

    /// True until the first content or stage event has been applied
    pub fn is_loading(&self) -> bool {
        self.lifecycle == Lifecycle::Pending
    }
}
