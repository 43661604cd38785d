//! Typed stream events and their wire format

use crate::continuation::ContinuationToken;
use serde::Deserialize;
use thiserror::Error;

/// One discrete event of a streamed assistant turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// New continuation token for the next turn
    Checkpoint { token: ContinuationToken },
    /// Text fragment to append to the response
    Content { text: String },
    /// The assistant started a search
    SearchStart { query: String },
    /// Search results are ready
    SearchResults { refs: Vec<String> },
    /// The search failed
    SearchError { message: String },
    /// The turn is over
    End,
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Checkpoint { .. } => "checkpoint",
            StreamEvent::Content { .. } => "content",
            StreamEvent::SearchStart { .. } => "search_start",
            StreamEvent::SearchResults { .. } => "search_results",
            StreamEvent::SearchError { .. } => "search_error",
            StreamEvent::End => "end",
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("malformed search results: {0}")]
    Results(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFrame {
    Checkpoint { checkpoint_id: String },
    Content { content: String },
    SearchStart { query: String },
    SearchResults { urls: WireUrls },
    SearchError { error: String },
    End,
    #[serde(other)]
    Unknown,
}

/// Result references arrive either as a list or as a JSON-encoded list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireUrls {
    List(Vec<String>),
    Encoded(String),
}

impl WireUrls {
    fn into_refs(self) -> Result<Vec<String>, FrameError> {
        match self {
            WireUrls::List(refs) => Ok(refs),
            WireUrls::Encoded(raw) => serde_json::from_str(&raw).map_err(FrameError::Results),
        }
    }
}

/// Decode one frame payload.
///
/// `Ok(None)` means the frame is well-formed but of a kind this client does
/// not know; callers skip it.
pub fn decode_frame(payload: &str) -> Result<Option<StreamEvent>, FrameError> {
    let frame: WireFrame = serde_json::from_str(payload).map_err(FrameError::Malformed)?;
    let event = match frame {
        WireFrame::Checkpoint { checkpoint_id } => StreamEvent::Checkpoint {
            token: ContinuationToken::new(checkpoint_id),
        },
        WireFrame::Content { content } => StreamEvent::Content { text: content },
        WireFrame::SearchStart { query } => StreamEvent::SearchStart { query },
        WireFrame::SearchResults { urls } => StreamEvent::SearchResults {
            refs: urls.into_refs()?,
        },
        WireFrame::SearchError { error } => StreamEvent::SearchError { message: error },
        WireFrame::End => StreamEvent::End,
        WireFrame::Unknown => return Ok(None),
    };
    Ok(Some(event))
}
