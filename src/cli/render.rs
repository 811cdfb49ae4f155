//! Terminal output for assistant replies.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::core::stream::{AssistantMessage, Citation, ToolCallState, ToolStatus};

/// Prints a streaming reply incrementally.
///
/// Answer text goes to `out`; tool progress and errors go to `err` so the
/// answer can be piped on its own.
pub struct StreamPrinter<W, E> {
    out: W,
    err: E,
    printed: usize,
    tools: HashMap<String, ToolStatus>,
}

impl<W: Write, E: Write> StreamPrinter<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self {
            out,
            err,
            printed: 0,
            tools: HashMap::new(),
        }
    }

    /// Print whatever changed since the last update.
    pub fn update(&mut self, message: &AssistantMessage) -> io::Result<()> {
        for call in &message.tool_calls {
            if self.tools.get(&call.id) != Some(&call.status) {
                self.tools.insert(call.id.clone(), call.status);
                writeln!(self.err, "{}", tool_line(call))?;
            }
        }

        if let Some(fresh) = message.content.get(self.printed..).filter(|s| !s.is_empty()) {
            self.out.write_all(fresh.as_bytes())?;
            self.printed = message.content.len();
        }

        self.out.flush()
    }

    /// Print the tail of the reply, any run error and the sources.
    pub fn finish(&mut self, message: &AssistantMessage) -> io::Result<()> {
        self.update(message)?;
        if self.printed > 0 {
            writeln!(self.out)?;
        }
        if let Some(error) = &message.error {
            writeln!(self.err, "run failed: {error}")?;
        }
        if let Some(citations) = message.citations.as_deref().filter(|c| !c.is_empty()) {
            write_sources(&mut self.out, citations)?;
        }
        self.out.flush()
    }
}

fn tool_line(call: &ToolCallState) -> String {
    match call.status {
        ToolStatus::Running => format!("  → {}…", call.name),
        ToolStatus::Completed => match call.duration {
            Some(secs) => format!("  ✓ {} ({secs:.1}s)", call.name),
            None => format!("  ✓ {}", call.name),
        },
        ToolStatus::Failed => match call.result.as_deref() {
            Some(reason) => format!("  ✗ {}: {}", call.name, first_line(reason)),
            None => format!("  ✗ {}", call.name),
        },
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// Print a numbered source list.
pub fn write_sources(out: &mut impl Write, citations: &[Citation]) -> io::Result<()> {
    writeln!(out, "\nSources:")?;
    for (i, citation) in citations.iter().enumerate() {
        writeln!(
            out,
            "  [{}] {} ({:.0}%)",
            i + 1,
            citation.document_name,
            citation.relevance_score * 100.0
        )?;
    }
    Ok(())
}

/// Print a finished reply in one go.
pub fn write_message(out: &mut impl Write, message: &AssistantMessage) -> io::Result<()> {
    writeln!(out, "{}", message.content)?;
    if let Some(citations) = message.citations.as_deref().filter(|c| !c.is_empty()) {
        write_sources(out, citations)?;
    }
    Ok(())
}
