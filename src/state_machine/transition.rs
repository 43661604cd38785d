//! Pure state transition function
//!
//! Stage events accumulate into the entry's tool activity: a stage is never
//! removed and `query` is fixed once recorded. Arrival order is authoritative.

use super::{Effect, TurnEvent};
use crate::decoder::StreamEvent;
use crate::transcript::{Lifecycle, Stage, ToolActivity, TranscriptEntry};
use thiserror::Error;

/// Shown when the channel fails before any text arrived
pub const STREAM_ERROR_MESSAGE: &str = "Sorry, there was an error processing your request.";

/// Shown when the channel could not be opened at all
pub const CONNECT_ERROR_MESSAGE: &str = "Sorry, there was an error connecting to the server.";

/// Shown when the user cancels before any text arrived
pub const CANCELLED_MESSAGE: &str = "Response cancelled.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub entry: TranscriptEntry,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(entry: TranscriptEntry) -> Self {
        Self {
            entry,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether the session should release the channel
    pub fn closes_channel(&self) -> bool {
        self.effects.contains(&Effect::CloseChannel)
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Entry is already {lifecycle:?}, ignoring {event}")]
    EntryFinalized {
        lifecycle: Lifecycle,
        event: &'static str,
    },
}

/// Pure transition function
///
/// Given the current entry and one event, produce the next entry value and
/// the effects the session must carry out. No I/O.
pub fn transition(
    entry: &TranscriptEntry,
    event: TurnEvent,
) -> Result<TransitionResult, TransitionError> {
    if entry.lifecycle.is_final() {
        return Err(TransitionError::EntryFinalized {
            lifecycle: entry.lifecycle,
            event: event.kind(),
        });
    }

    let mut next = entry.clone();

    let result = match event {
        // ============================================================
        // Stream events
        // ============================================================
        TurnEvent::Stream(StreamEvent::Checkpoint { token }) => {
            TransitionResult::new(next).with_effect(Effect::UpdateContinuation { token })
        }

        TurnEvent::Stream(StreamEvent::Content { text }) => {
            next.text.push_str(&text);
            begin_streaming(&mut next);
            TransitionResult::new(next)
        }

        TurnEvent::Stream(StreamEvent::SearchStart { query }) => {
            if let Some(activity) = &mut next.tool_activity {
                activity.push_stage(Stage::Searching);
            } else {
                next.tool_activity = Some(ToolActivity::new(Stage::Searching, query));
            }
            begin_streaming(&mut next);
            TransitionResult::new(next)
        }

        TurnEvent::Stream(StreamEvent::SearchResults { refs }) => {
            let activity = next.tool_activity.get_or_insert_with(ToolActivity::default);
            activity.push_stage(Stage::Reading);
            activity.result_refs = refs;
            begin_streaming(&mut next);
            TransitionResult::new(next)
        }

        TurnEvent::Stream(StreamEvent::SearchError { message }) => {
            let activity = next.tool_activity.get_or_insert_with(ToolActivity::default);
            activity.push_stage(Stage::Error);
            activity.error_detail = Some(message);
            begin_streaming(&mut next);
            TransitionResult::new(next)
        }

        TurnEvent::Stream(StreamEvent::End) => {
            if let Some(activity) = &mut next.tool_activity {
                activity.push_stage(Stage::Writing);
            }
            next.lifecycle = Lifecycle::Complete;
            TransitionResult::new(next).with_effect(Effect::CloseChannel)
        }

        // ============================================================
        // Channel failures and cancellation
        // ============================================================
        TurnEvent::OpenFailed { .. } => {
            finish_interrupted(&mut next, CONNECT_ERROR_MESSAGE);
            TransitionResult::new(next).with_effect(Effect::CloseChannel)
        }

        TurnEvent::TransportFailed { .. } | TurnEvent::ChannelClosed => {
            finish_interrupted(&mut next, STREAM_ERROR_MESSAGE);
            TransitionResult::new(next).with_effect(Effect::CloseChannel)
        }

        TurnEvent::Cancelled => {
            finish_interrupted(&mut next, CANCELLED_MESSAGE);
            TransitionResult::new(next).with_effect(Effect::CloseChannel)
        }
    };

    Ok(result)
}

// Helper functions

fn begin_streaming(entry: &mut TranscriptEntry) {
    if entry.lifecycle == Lifecycle::Pending {
        entry.lifecycle = Lifecycle::Streaming;
    }
}

/// Keep text that already arrived; fall back to `message` only when there is none.
fn finish_interrupted(entry: &mut TranscriptEntry, message: &str) {
    if entry.text.is_empty() {
        entry.text.push_str(message);
        entry.lifecycle = Lifecycle::Failed;
    } else {
        entry.lifecycle = Lifecycle::Complete;
    }
}
