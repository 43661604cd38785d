//! Ordered entry store

use super::{Author, EntryId, TranscriptEntry, GREETING};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered transcript keyed by entry id
///
/// Entries are shared behind `Arc` and never mutated in place: an update
/// swaps the whole value for its id. The id index is shared between clones
/// and copied only when an append follows a clone, so publishing a snapshot
/// per update costs one pointer per entry.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Arc<TranscriptEntry>>,
    positions: Arc<HashMap<EntryId, usize>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript opening with the assistant greeting, then the given history
    pub fn seeded(history: impl IntoIterator<Item = TranscriptEntry>) -> Self {
        let mut transcript = Self::new();
        transcript.append(TranscriptEntry::complete(
            EntryId::generate(),
            Author::Assistant,
            GREETING,
        ));
        for entry in history {
            if !transcript.append(entry) {
                tracing::warn!("Skipping history entry with duplicate id");
            }
        }
        transcript
    }

    /// Append a new entry.
    ///
    /// Returns `false` (and leaves the transcript untouched) if an entry with
    /// the same id already exists.
    pub fn append(&mut self, entry: TranscriptEntry) -> bool {
        if self.positions.contains_key(&entry.id) {
            return false;
        }
        let position = self.entries.len();
        Arc::make_mut(&mut self.positions).insert(entry.id.clone(), position);
        self.entries.push(Arc::new(entry));
        true
    }

    /// Swap in a new value for an existing entry, returning the old one
    pub fn replace(&mut self, entry: TranscriptEntry) -> Option<Arc<TranscriptEntry>> {
        let position = *self.positions.get(&entry.id)?;
        Some(std::mem::replace(
            &mut self.entries[position],
            Arc::new(entry),
        ))
    }

    pub fn get(&self, id: &EntryId) -> Option<&TranscriptEntry> {
        self.positions
            .get(id)
            .map(|&position| self.entries[position].as_ref())
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter().map(AsRef::as_ref)
    }
}
