//! Conversation transcript
//!
//! Ordered log of entries shown to the user. Entries are immutable values;
//! every update replaces a whole entry by id.

mod entry;
mod store;

pub use entry::{Author, EntryId, Lifecycle, Stage, ToolActivity, TranscriptEntry};
pub use store::Transcript;

/// Text of the assistant greeting that opens every transcript
pub const GREETING: &str = "Hi there, how can I help you?";
