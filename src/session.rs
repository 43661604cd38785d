//! Transport session
//!
//! Owns the transcript of one thread and at most one streaming turn at a
//! time. A spawned listener feeds decoded events through the turn state
//! machine; every application happens under the session lock, and the
//! resulting transcript snapshot is published to subscribers.

use crate::backend::{ChatBackend, HistoryMessage, TransportError, TurnRequest};
use crate::config::ClientConfig;
use crate::continuation::{ContinuationToken, ContinuationTracker};
use crate::decoder::StreamDecoder;
use crate::state_machine::{transition, Effect, TurnEvent};
use crate::transcript::{EntryId, Transcript, TranscriptEntry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("A response is still streaming; cancel it before sending another message")]
    TurnInFlight,

    #[error("Message is empty")]
    EmptyInput,
}

/// The turn currently owning the channel
struct ActiveTurn {
    entry_id: EntryId,
    cancel: CancellationToken,
}

struct Inner {
    transcript: Transcript,
    continuation: ContinuationTracker,
    active: Option<ActiveTurn>,
}

struct Shared {
    backend: Arc<dyn ChatBackend>,
    max_frame_bytes: usize,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<Transcript>,
}

/// Chat session for a single thread
pub struct ChatSession {
    shared: Arc<Shared>,
}

impl ChatSession {
    /// Session for a new thread
    pub fn new(backend: Arc<dyn ChatBackend>, config: &ClientConfig) -> Self {
        Self::with_state(
            backend,
            config,
            Transcript::seeded(Vec::new()),
            ContinuationTracker::new(),
        )
    }

    /// Session continuing an existing thread: its history is loaded and the
    /// thread id becomes the continuation token
    pub async fn resume(
        backend: Arc<dyn ChatBackend>,
        config: &ClientConfig,
        thread_id: &str,
    ) -> Result<Self, TransportError> {
        let history = backend.thread_history(thread_id).await?;
        tracing::info!(thread_id = %thread_id, messages = history.len(), "Resuming thread");

        let transcript = Transcript::seeded(history.into_iter().map(HistoryMessage::into_entry));
        Ok(Self::with_state(
            backend,
            config,
            transcript,
            ContinuationTracker::resume(thread_id),
        ))
    }

    fn with_state(
        backend: Arc<dyn ChatBackend>,
        config: &ClientConfig,
        transcript: Transcript,
        continuation: ContinuationTracker,
    ) -> Self {
        let (snapshots, _) = watch::channel(transcript.clone());
        Self {
            shared: Arc::new(Shared {
                backend,
                max_frame_bytes: config.max_frame_bytes,
                inner: Mutex::new(Inner {
                    transcript,
                    continuation,
                    active: None,
                }),
                snapshots,
            }),
        }
    }

    /// Send a message and start streaming the reply.
    ///
    /// The user entry and a pending assistant entry are appended right away;
    /// the channel is opened by the spawned listener.
    pub fn start_turn(&self, input: &str) -> Result<TurnHandle, SessionError> {
        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let (request, entry_id, cancel) = {
            let mut inner = self.shared.lock();
            if inner.active.is_some() {
                return Err(SessionError::TurnInFlight);
            }

            let placeholder = TranscriptEntry::assistant_placeholder();
            let entry_id = placeholder.id.clone();
            inner.transcript.append(TranscriptEntry::user(input));
            inner.transcript.append(placeholder);

            let cancel = CancellationToken::new();
            inner.active = Some(ActiveTurn {
                entry_id: entry_id.clone(),
                cancel: cancel.clone(),
            });

            let request = TurnRequest {
                input: input.to_string(),
                continuation: inner.continuation.current().cloned(),
            };
            self.shared.snapshots.send_replace(inner.transcript.clone());
            (request, entry_id, cancel)
        };

        tracing::info!(
            entry_id = %entry_id,
            continuation = ?request.continuation.as_ref().map(ContinuationToken::as_str),
            "Starting turn"
        );

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(run_turn(shared, request, entry_id.clone(), cancel));
        Ok(TurnHandle { entry_id, task })
    }

    /// Abandon the in-flight turn, if any.
    ///
    /// The entry keeps whatever content already arrived; with none it is
    /// marked failed. Returns `false` when no turn was in flight.
    pub fn cancel_turn(&self) -> bool {
        let mut inner = self.shared.lock();
        let Some(active) = inner.active.take() else {
            return false;
        };
        active.cancel.cancel();

        let Some(current) = inner.transcript.get(&active.entry_id).cloned() else {
            return true;
        };
        match transition(&current, TurnEvent::Cancelled) {
            Ok(result) => {
                inner.transcript.replace(result.entry);
                self.shared.snapshots.send_replace(inner.transcript.clone());
                tracing::info!(entry_id = %active.entry_id, "Turn cancelled");
            }
            Err(e) => tracing::debug!(error = %e, "Cancelled turn was already finalized"),
        }
        true
    }

    /// Release the channel of the in-flight turn; safe to call repeatedly
    pub fn close(&self) {
        self.cancel_turn();
    }

    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.shared.snapshots.subscribe()
    }

    /// Snapshot of the transcript as of now
    pub fn transcript(&self) -> Transcript {
        self.shared.lock().transcript.clone()
    }

    /// Token the next turn will carry
    pub fn continuation(&self) -> Option<ContinuationToken> {
        self.shared.lock().continuation.current().cloned()
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to a started turn
pub struct TurnHandle {
    entry_id: EntryId,
    task: JoinHandle<()>,
}

impl TurnHandle {
    /// Id of the assistant entry this turn streams into
    pub fn entry_id(&self) -> &EntryId {
        &self.entry_id
    }

    /// Wait for the listener to release the channel
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            tracing::error!(entry_id = %self.entry_id, error = %e, "Turn listener failed");
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one event to the turn's entry.
    ///
    /// Returns `true` while the listener should keep reading.
    fn apply(&self, entry_id: &EntryId, cancel: &CancellationToken, event: TurnEvent) -> bool {
        let mut inner = self.lock();
        if cancel.is_cancelled() {
            tracing::debug!(event = event.kind(), "Ignoring event for a closed turn");
            return false;
        }

        let Some(current) = inner.transcript.get(entry_id).cloned() else {
            tracing::warn!(entry_id = %entry_id, "Turn entry missing from transcript");
            return false;
        };

        let event_kind = event.kind();
        let result = match transition(&current, event) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring event");
                return false;
            }
        };

        let keep_reading = !result.closes_channel();
        inner.transcript.replace(result.entry);
        for effect in result.effects {
            match effect {
                Effect::UpdateContinuation { token } => inner.continuation.observe_checkpoint(token),
                Effect::CloseChannel => {
                    if inner
                        .active
                        .as_ref()
                        .is_some_and(|active| active.entry_id == *entry_id)
                    {
                        inner.active = None;
                    }
                    cancel.cancel();
                }
            }
        }

        tracing::trace!(event = event_kind, "Applied turn event");
        self.snapshots.send_replace(inner.transcript.clone());
        keep_reading
    }
}

/// Listener for one turn: opens the channel and drains it into the session
async fn run_turn(
    shared: Arc<Shared>,
    request: TurnRequest,
    entry_id: EntryId,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        opened = shared.backend.open_stream(&request) => opened,
    };

    let channel = match opened {
        Ok(channel) => channel,
        Err(e) => {
            tracing::error!(entry_id = %entry_id, error = %e, kind = ?e.kind, "Failed to open turn stream");
            shared.apply(
                &entry_id,
                &cancel,
                TurnEvent::OpenFailed {
                    message: e.to_string(),
                },
            );
            return;
        }
    };

    let mut decoder = StreamDecoder::new(channel, shared.max_frame_bytes);
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = decoder.next_event() => match next {
                Some(Ok(event)) => TurnEvent::Stream(event),
                Some(Err(e)) => {
                    tracing::error!(entry_id = %entry_id, error = %e, kind = ?e.kind, "Turn stream failed");
                    TurnEvent::TransportFailed { message: e.to_string() }
                }
                None => {
                    tracing::warn!(entry_id = %entry_id, "Turn stream closed before end");
                    TurnEvent::ChannelClosed
                }
            },
        };

        if !shared.apply(&entry_id, &cancel, event) {
            break;
        }
    }

    tracing::info!(
        entry_id = %entry_id,
        dropped_frames = decoder.dropped_frames(),
        "Turn stream released"
    );
}
