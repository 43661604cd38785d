//! Events that can occur during a turn

use crate::decoder::StreamEvent;

/// Events that drive an assistant entry through its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// A decoded event from the turn's channel
    Stream(StreamEvent),

    /// The channel could not be opened
    OpenFailed { message: String },

    /// The channel failed after it was opened
    TransportFailed { message: String },

    /// The channel ended before the `end` event
    ChannelClosed,

    /// The user abandoned the turn
    Cancelled,
}

impl TurnEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TurnEvent::Stream(event) => event.kind(),
            TurnEvent::OpenFailed { .. } => "open_failed",
            TurnEvent::TransportFailed { .. } => "transport_failed",
            TurnEvent::ChannelClosed => "channel_closed",
            TurnEvent::Cancelled => "cancelled",
        }
    }
}

impl From<StreamEvent> for TurnEvent {
    fn from(event: StreamEvent) -> Self {
        TurnEvent::Stream(event)
    }
}
