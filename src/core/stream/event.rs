//! Typed run events decoded from stream frames.

use serde_json::{Map, Value};

/// A run event the aggregator reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of assistant text.
    ContentDelta { text: String },
    /// A tool call began.
    ToolCallStarted {
        id: String,
        name: String,
        arguments: Value,
    },
    /// A tool call finished.
    ToolCallCompleted {
        id: String,
        result: Option<String>,
        is_error: bool,
        /// Seconds.
        duration: Option<f64>,
    },
    /// The run finished normally.
    RunCompleted,
    /// The run ended with an error.
    RunFailed { message: String },
    /// The run was cancelled server-side.
    RunCancelled,
}

impl StreamEvent {
    /// Whether this event ends the run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted | Self::RunFailed { .. } | Self::RunCancelled
        )
    }
}

/// A stream event plus the correlation ids carried on its frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub event: StreamEvent,
    pub session_id: Option<String>,
    pub run_id: Option<String>,
}

impl EventEnvelope {
    /// Interpret a decoded frame.
    ///
    /// Returns `None` for discriminants the aggregator does not track
    /// (`RunStarted`, reasoning and memory events, ...) and for tool events
    /// without a tool call id.
    #[must_use]
    pub fn from_frame(frame: &Value) -> Option<Self> {
        let kind = frame.get("event")?.as_str()?;

        let event = match kind {
            "RunContent" => StreamEvent::ContentDelta {
                text: text_of(frame.get("content"))?,
            },
            "ToolCallStarted" => {
                let tool = WireTool::from_frame(frame)?;
                StreamEvent::ToolCallStarted {
                    id: tool.id,
                    name: tool.name,
                    arguments: tool.arguments,
                }
            }
            "ToolCallCompleted" => {
                let tool = WireTool::from_frame(frame)?;
                StreamEvent::ToolCallCompleted {
                    id: tool.id,
                    result: tool.result,
                    is_error: tool.is_error,
                    duration: tool.duration,
                }
            }
            "RunCompleted" => StreamEvent::RunCompleted,
            "RunError" => StreamEvent::RunFailed {
                message: text_of(frame.get("content"))
                    .or_else(|| text_of(frame.get("error")))
                    .unwrap_or_else(|| "run failed".to_string()),
            },
            "RunCancelled" => StreamEvent::RunCancelled,
            other => {
                tracing::trace!(event = other, "ignoring untracked run event");
                return None;
            }
        };

        Some(Self {
            event,
            session_id: string_field(frame, "session_id"),
            run_id: string_field(frame, "run_id"),
        })
    }
}

/// Tool call fields, read from the nested `tool` object or the frame itself.
struct WireTool {
    id: String,
    name: String,
    arguments: Value,
    result: Option<String>,
    is_error: bool,
    duration: Option<f64>,
}

impl WireTool {
    fn from_frame(frame: &Value) -> Option<Self> {
        let obj: &Map<String, Value> = frame
            .get("tool")
            .and_then(Value::as_object)
            .or_else(|| frame.as_object())?;

        let Some(id) = first_str(obj, &["tool_call_id", "id"]) else {
            tracing::debug!("dropping tool event without a tool call id");
            return None;
        };

        let duration = obj
            .get("metrics")
            .and_then(|m| m.get("duration"))
            .or_else(|| obj.get("duration"))
            .and_then(Value::as_f64);

        Some(Self {
            id,
            name: first_str(obj, &["tool_name", "name"]).unwrap_or_default(),
            arguments: ["tool_args", "arguments"]
                .iter()
                .find_map(|k| obj.get(*k).cloned())
                .unwrap_or(Value::Null),
            result: text_of(obj.get("result")),
            is_error: ["tool_call_error", "error"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_bool))
                .unwrap_or(false),
            duration,
        })
    }
}

fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn string_field(frame: &Value, key: &str) -> Option<String> {
    frame
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Strings pass through; other non-null payloads are kept as JSON text.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
