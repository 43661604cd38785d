//! Stream decoder
//!
//! Turns the raw byte channel of one turn into an ordered sequence of typed
//! [`StreamEvent`]s. A malformed frame (bad JSON, bad encoding, or a line
//! over the size limit) is logged and dropped; only channel-level failures
//! end the sequence early.

mod frame;
mod line;
mod sse;

pub use frame::{decode_frame, FrameError, StreamEvent};
pub use sse::FrameAssembler;

use crate::backend::{ByteStream, TransportError};
use futures::{Stream, StreamExt, TryStreamExt};
use line::{LineSplitter, RawLine};
use std::pin::Pin;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

/// Default upper bound on a single line of the stream
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

type IoStream = Pin<Box<dyn Stream<Item = std::io::Result<bytes::Bytes>> + Send>>;

/// Decoder for a single turn's channel; not restartable
pub struct StreamDecoder {
    lines: FramedRead<StreamReader<IoStream, bytes::Bytes>, LineSplitter>,
    assembler: FrameAssembler,
    max_frame_bytes: usize,
    channel_done: bool,
    finished: bool,
    dropped_frames: usize,
}

impl StreamDecoder {
    pub fn new(channel: ByteStream, max_frame_bytes: usize) -> Self {
        let io: IoStream = Box::pin(channel.map_err(std::io::Error::other));
        Self {
            lines: FramedRead::new(
                StreamReader::new(io),
                LineSplitter::new(max_frame_bytes),
            ),
            assembler: FrameAssembler::new(),
            max_frame_bytes,
            channel_done: false,
            finished: false,
            dropped_frames: 0,
        }
    }

    /// Next event in arrival order.
    ///
    /// Returns `None` once the channel has closed or after the `end` event.
    /// A transport error is yielded once, then the sequence is over.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>> {
        if self.finished {
            return None;
        }

        loop {
            let payload = match self.next_payload().await {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            match decode_frame(&payload) {
                Ok(Some(event)) => {
                    if event == StreamEvent::End {
                        self.finished = true;
                    }
                    return Some(Ok(event));
                }
                Ok(None) => {
                    tracing::debug!(frame = %preview(&payload), "Skipping frame of unknown type");
                }
                Err(err) => self.drop_frame(&err, &preview(&payload)),
            }
        }
    }

    /// Number of frames dropped as malformed so far
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    fn drop_frame(&mut self, error: &dyn std::fmt::Display, frame: &str) {
        self.dropped_frames += 1;
        tracing::warn!(
            error = %error,
            frame = %frame,
            dropped = self.dropped_frames,
            "Dropping malformed stream frame"
        );
    }

    async fn next_payload(&mut self) -> Result<Option<String>, TransportError> {
        while !self.channel_done {
            match self.lines.next().await {
                Some(Ok(RawLine::Line(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(line) => {
                        if let Some(payload) = self.assembler.push_line(line) {
                            return Ok(Some(payload));
                        }
                    }
                    Err(err) => {
                        self.assembler.reset();
                        let shown = preview(&String::from_utf8_lossy(&bytes));
                        self.drop_frame(&err, &shown);
                    }
                },
                Some(Ok(RawLine::Oversized)) => {
                    self.assembler.reset();
                    let limit = format!("line exceeds {} bytes", self.max_frame_bytes);
                    self.drop_frame(&limit, "<oversized>");
                }
                Some(Err(err)) => {
                    self.channel_done = true;
                    return Err(TransportError::from_io(err));
                }
                None => self.channel_done = true,
            }
        }
        Ok(self.assembler.finish())
    }
}

fn preview(payload: &str) -> String {
    const MAX_PREVIEW_CHARS: usize = 120;
    let mut preview: String = payload.chars().take(MAX_PREVIEW_CHARS).collect();
    if payload.chars().nth(MAX_PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}
