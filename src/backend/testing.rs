//! In-memory backend for testing
//!
//! Turns are scripted ahead of time, either as a complete list of frames or
//! as a live channel the test feeds while the session is listening.

use super::{ByteStream, ChatBackend, HistoryMessage, TransportError, TurnRequest};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type Chunk = Result<bytes::Bytes, TransportError>;

enum ScriptedTurn {
    Stream(ByteStream),
    Fail(TransportError),
}

/// Backend double that replays queued turns in order
pub struct ScriptedBackend {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    history: HashMap<String, Vec<HistoryMessage>>,
    threads: Vec<String>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            history: HashMap::new(),
            threads: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_history(mut self, thread_id: &str, messages: Vec<HistoryMessage>) -> Self {
        self.threads.push(thread_id.to_string());
        self.history.insert(thread_id.to_string(), messages);
        self
    }

    /// Queue a turn whose channel delivers the given JSON payloads and closes
    pub fn queue_frames(&self, payloads: &[&str]) {
        let chunks: Vec<Chunk> = payloads.iter().map(|payload| Ok(sse_frame(payload))).collect();
        self.push(ScriptedTurn::Stream(Box::pin(futures::stream::iter(chunks))));
    }

    /// Queue a turn driven live through the returned sender
    pub fn queue_channel(&self) -> FrameSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(ScriptedTurn::Stream(Box::pin(UnboundedReceiverStream::new(rx))));
        FrameSender { tx }
    }

    /// Queue a turn whose channel cannot be opened
    pub fn queue_open_failure(&self, error: TransportError) {
        self.push(ScriptedTurn::Fail(error));
    }

    /// Every stream request made so far, oldest first
    pub fn recorded_requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, turn: ScriptedTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn open_stream(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.turns.lock().unwrap().pop_front() {
            Some(ScriptedTurn::Stream(stream)) => Ok(stream),
            Some(ScriptedTurn::Fail(error)) => Err(error),
            None => Err(TransportError::connect("No scripted turn queued")),
        }
    }

    async fn thread_history(&self, thread_id: &str) -> Result<Vec<HistoryMessage>, TransportError> {
        self.history
            .get(thread_id)
            .cloned()
            .ok_or_else(|| TransportError::status(format!("HTTP 404 Not Found: {thread_id}")))
    }

    async fn thread_list(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.threads.clone())
    }
}

/// Test-side handle feeding a live turn channel
pub struct FrameSender {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl FrameSender {
    /// Send one JSON payload as an event-stream frame.
    ///
    /// Returns `false` once the session has dropped the channel.
    pub fn frame(&self, payload: &str) -> bool {
        self.tx.send(Ok(sse_frame(payload))).is_ok()
    }

    /// Send raw bytes as-is
    pub fn raw(&self, text: &str) -> bool {
        self.tx
            .send(Ok(bytes::Bytes::copy_from_slice(text.as_bytes())))
            .is_ok()
    }

    /// Fail the channel with a transport error
    pub fn fail(&self, error: TransportError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Whether the session has released its end of the channel
    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the session releases its end of the channel
    pub async fn released(&self) {
        self.tx.closed().await;
    }
}

fn sse_frame(payload: &str) -> bytes::Bytes {
    bytes::Bytes::from(format!("data: {payload}\n\n"))
}
