//! Conversation backend client
//!
//! The backend streams assistant turns and serves thread history. This module
//! hides it behind [`ChatBackend`] so the session can run against an
//! in-memory double in tests.

mod error;
mod http;
#[cfg(test)]
pub mod testing;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpBackend;

use crate::continuation::ContinuationToken;
use crate::transcript::{Author, EntryId, TranscriptEntry};
use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;

/// Raw byte channel carrying one turn's events
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, TransportError>> + Send>>;

/// Discriminator the backend uses for messages typed by the user
const USER_MESSAGE_TYPE: &str = "HumanMessage";

/// What the session asks the backend for when a turn starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub input: String,
    pub continuation: Option<ContinuationToken>,
}

/// A prior message as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryMessage {
    pub id: String,
    #[serde(rename = "message_content")]
    pub content: String,
    #[serde(rename = "message_type")]
    pub message_type: String,
}

impl HistoryMessage {
    pub fn author(&self) -> Author {
        if self.message_type == USER_MESSAGE_TYPE {
            Author::User
        } else {
            Author::Assistant
        }
    }

    pub fn into_entry(self) -> TranscriptEntry {
        let author = self.author();
        TranscriptEntry::complete(EntryId::from(self.id), author, self.content)
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open the streaming channel for one turn
    async fn open_stream(&self, request: &TurnRequest) -> Result<ByteStream, TransportError>;

    /// Prior messages of a thread, oldest first
    async fn thread_history(&self, thread_id: &str) -> Result<Vec<HistoryMessage>, TransportError>;

    /// Identifiers of known threads
    async fn thread_list(&self) -> Result<Vec<String>, TransportError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn open_stream(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        (**self).open_stream(request).await
    }

    async fn thread_history(&self, thread_id: &str) -> Result<Vec<HistoryMessage>, TransportError> {
        (**self).thread_history(thread_id).await
    }

    async fn thread_list(&self) -> Result<Vec<String>, TransportError> {
        (**self).thread_list().await
    }
}
