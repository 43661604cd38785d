//! Line-level framing for the event stream
//!
//! The backend speaks `text/event-stream`: one or more `data:` lines make up a
//! payload, and a blank line dispatches it. Bare JSON lines are also accepted
//! so a newline-delimited stream decodes the same way.

/// Assembles frame payloads from individual lines
#[derive(Debug, Default)]
pub struct FrameAssembler {
    data: String,
    has_data: bool,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator).
    ///
    /// Returns a complete payload when the line finishes one.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take();
        }

        // Comment, used by servers as keep-alive
        if line.starts_with(':') {
            return None;
        }

        if !self.has_data && line.trim_start().starts_with('{') {
            return Some(line.to_string());
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" | "id" | "retry" => {}
            other => {
                tracing::debug!(field = %other, "Ignoring unknown event-stream field");
            }
        }
        None
    }

    /// Flush a payload left open when the channel ended without a blank line
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    /// Discard a partially assembled payload
    pub fn reset(&mut self) {
        self.data.clear();
        self.has_data = false;
    }

    fn take(&mut self) -> Option<String> {
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(std::mem::take(&mut self.data))
    }
}
