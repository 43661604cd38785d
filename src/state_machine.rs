//! Turn state machine
//!
//! Folds the events of one streamed assistant turn into its transcript entry.
//! Implements the Elm Architecture pattern with pure state transitions: the
//! session feeds events in arrival order and executes the returned effects.

mod effect;
pub mod event;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::TurnEvent;
pub use transition::{
    transition, TransitionError, TransitionResult, CANCELLED_MESSAGE, CONNECT_ERROR_MESSAGE,
    STREAM_ERROR_MESSAGE,
};
