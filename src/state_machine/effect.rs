//! Effects produced by state transitions

use crate::continuation::ContinuationToken;

/// Effects to be executed by the session after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Remember the checkpoint for the next turn
    UpdateContinuation { token: ContinuationToken },

    /// The turn is over; release the channel
    CloseChannel,
}
