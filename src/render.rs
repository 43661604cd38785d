//! Plain-text rendering of transcript entries for the terminal.
//!
//! Finished entries are printed whole; the in-flight entry is printed
//! progressively by [`ProgressPrinter`], which only writes what changed since
//! the last snapshot.

use crate::transcript::{Author, Lifecycle, Stage, ToolActivity, TranscriptEntry};
use std::io::{self, Write};

fn author_label(author: Author) -> &'static str {
    match author {
        Author::User => "you",
        Author::Assistant => "assistant",
    }
}

/// One-line description of a stage, e.g. `reading 3 sources`
fn describe_stage(stage: Stage, activity: &ToolActivity) -> String {
    match stage {
        Stage::Searching if activity.query.is_empty() => stage.to_string(),
        Stage::Searching => format!("searching \"{}\"", activity.query),
        Stage::Reading => match activity.result_refs.len() {
            1 => "reading 1 source".to_string(),
            n => format!("reading {n} sources"),
        },
        Stage::Writing => stage.to_string(),
        Stage::Error => match &activity.error_detail {
            Some(detail) => format!("search failed: {detail}"),
            None => "search failed".to_string(),
        },
    }
}

/// The full stage trace, e.g. `[searching "x" > reading 2 sources > writing]`
pub fn stage_trace(activity: &ToolActivity) -> String {
    let stages: Vec<String> = activity
        .stages
        .iter()
        .map(|&stage| describe_stage(stage, activity))
        .collect();
    format!("[{}]", stages.join(" > "))
}

/// Render a finished entry, with its stage trace and sources if any
pub fn render_entry(entry: &TranscriptEntry) -> String {
    let mut out = String::new();
    if let Some(activity) = &entry.tool_activity {
        out.push_str(&stage_trace(activity));
        out.push('\n');
    }
    out.push_str(author_label(entry.author));
    out.push_str("> ");
    out.push_str(&entry.text);
    if entry.lifecycle == Lifecycle::Failed {
        out.push_str(" (failed)");
    }
    if let Some(activity) = &entry.tool_activity {
        for (index, source) in activity.result_refs.iter().enumerate() {
            out.push_str(&format!("\n  [{}] {source}", index + 1));
        }
    }
    out
}

/// Writes the growth of a single streaming entry
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    waiting_shown: bool,
    mid_line: bool,
    printed_text: usize,
    printed_stages: usize,
    finished: bool,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print whatever is new in `entry` since the previous call.
    ///
    /// Stage changes go on their own lines; text fragments are appended to
    /// the reply line. Once the entry is final, the sources are listed and
    /// further calls print nothing.
    pub fn update(&mut self, entry: &TranscriptEntry, out: &mut impl Write) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }

        if entry.is_loading() && !self.waiting_shown {
            writeln!(out, "  ... waiting for a reply")?;
            self.waiting_shown = true;
        }

        if let Some(activity) = &entry.tool_activity {
            for &stage in activity.stages.iter().skip(self.printed_stages) {
                if self.mid_line {
                    writeln!(out)?;
                    self.mid_line = false;
                }
                writeln!(out, "  ... {}", describe_stage(stage, activity))?;
            }
            self.printed_stages = activity.stages.len();
        }

        let fresh = entry.text.get(self.printed_text..).unwrap_or(&entry.text);
        if !fresh.is_empty() {
            if !self.mid_line {
                write!(out, "{}> ", author_label(entry.author))?;
                self.mid_line = true;
            }
            write!(out, "{fresh}")?;
            self.printed_text = entry.text.len();
        }

        if entry.lifecycle.is_final() {
            if self.mid_line {
                if entry.lifecycle == Lifecycle::Failed {
                    write!(out, " (failed)")?;
                }
                writeln!(out)?;
                self.mid_line = false;
            }
            if let Some(activity) = &entry.tool_activity {
                for (index, source) in activity.result_refs.iter().enumerate() {
                    writeln!(out, "  [{}] {source}", index + 1)?;
                }
            }
            self.finished = true;
        }
        out.flush()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
