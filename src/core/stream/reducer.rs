//! Folds run events into an in-progress assistant message.
//!
//! The reducer takes a snapshot by value and returns the next one, so the
//! caller decides where the current message lives and tests can replay a
//! sequence of events without any shared state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::{EventEnvelope, StreamEvent};
use crate::core::new_message_id;

/// Tool name whose results carry retrieved knowledge.
pub const DEFAULT_KNOWLEDGE_TOOL: &str = "search_knowledge_base";

/// Lifecycle of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Running,
    Completed,
    Failed,
}

/// A tool call observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub status: ToolStatus,
    pub result: Option<String>,
    /// Seconds.
    pub duration: Option<f64>,
}

/// A retrieved document excerpt backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub document_name: String,
    pub chunk_text: String,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
}

/// Assistant reply being assembled from a run stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: String,
    pub run_id: Option<String>,
    pub content: String,
    /// Insertion order, unique by id.
    pub tool_calls: Vec<ToolCallState>,
    pub citations: Option<Vec<Citation>>,
    pub complete: bool,
    /// Set when the run ended with `RunError`.
    pub error: Option<String>,
}

impl AssistantMessage {
    /// Create an empty, incomplete message.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            run_id: None,
            content: String::new(),
            tool_calls: Vec::new(),
            citations: None,
            complete: false,
            error: None,
        }
    }

    /// Look up a tool call by id.
    #[must_use]
    pub fn tool_call(&self, id: &str) -> Option<&ToolCallState> {
        self.tool_calls.iter().find(|t| t.id == id)
    }

    fn tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCallState> {
        self.tool_calls.iter_mut().find(|t| t.id == id)
    }
}

/// Event reducer for assistant messages.
#[derive(Debug, Clone)]
pub struct Reducer {
    knowledge_tool: String,
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new(DEFAULT_KNOWLEDGE_TOOL)
    }
}

impl Reducer {
    /// Create a reducer that derives citations from `knowledge_tool` results.
    pub fn new(knowledge_tool: impl Into<String>) -> Self {
        Self {
            knowledge_tool: knowledge_tool.into(),
        }
    }

    /// Name of the tool whose results yield citations.
    #[must_use]
    pub fn knowledge_tool(&self) -> &str {
        &self.knowledge_tool
    }

    /// Apply one event to a message, starting a fresh message when `None`.
    ///
    /// A complete message is returned unchanged.
    #[must_use]
    pub fn reduce(&self, message: Option<AssistantMessage>, event: &StreamEvent) -> AssistantMessage {
        let mut message = message.unwrap_or_else(|| AssistantMessage::new(new_message_id()));
        if message.complete {
            tracing::trace!(message_id = %message.id, "ignoring event after completion");
            return message;
        }

        match event {
            StreamEvent::ContentDelta { text } => message.content.push_str(text),

            StreamEvent::ToolCallStarted {
                id,
                name,
                arguments,
            } => {
                let state = ToolCallState {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                    status: ToolStatus::Running,
                    result: None,
                    duration: None,
                };
                match message.tool_call_mut(id) {
                    Some(existing) => *existing = state,
                    None => message.tool_calls.push(state),
                }
            }

            StreamEvent::ToolCallCompleted {
                id,
                result,
                is_error,
                duration,
            } => {
                let Some(call) = message.tool_call_mut(id) else {
                    tracing::debug!(tool_call_id = %id, "completion for unknown tool call dropped");
                    return message;
                };
                call.status = if *is_error {
                    ToolStatus::Failed
                } else {
                    ToolStatus::Completed
                };
                call.result.clone_from(result);
                call.duration = *duration;

                let derived = (call.name == self.knowledge_tool)
                    .then(|| result.as_deref())
                    .flatten()
                    .map(decode_tool_result)
                    .and_then(|decoded| derive_citations(&decoded));

                if let Some(citations) = derived {
                    tracing::debug!(count = citations.len(), "derived citations from knowledge search");
                    message.citations = Some(citations);
                }
            }

            StreamEvent::RunCompleted | StreamEvent::RunCancelled => message.complete = true,

            StreamEvent::RunFailed { message: error } => {
                message.error = Some(error.clone());
                message.complete = true;
            }
        }

        message
    }

    /// Apply an envelope, also recording the run id it carries.
    #[must_use]
    pub fn apply(&self, message: Option<AssistantMessage>, envelope: &EventEnvelope) -> AssistantMessage {
        let mut message = self.reduce(message, &envelope.event);
        if message.run_id.is_none() {
            message.run_id.clone_from(&envelope.run_id);
        }
        message
    }
}

/// Tool output after the JSON decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Json(Value),
    Raw(String),
}

/// Decode a tool result, falling back to the raw text.
///
/// A result that decodes to a JSON string is decoded once more, since tools
/// commonly return serialized JSON that the run stream serializes again.
#[must_use]
pub fn decode_tool_result(raw: &str) -> ToolResult {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(value) => ToolResult::Json(value),
            Err(_) => ToolResult::Json(Value::String(inner)),
        },
        Ok(value) => ToolResult::Json(value),
        Err(_) => ToolResult::Raw(raw.to_string()),
    }
}

/// Build citations from a decoded knowledge-search result.
///
/// Returns `None` unless the result is a sequence with at least one record
/// carrying `content`, `text` or `name`.
#[must_use]
pub fn derive_citations(result: &ToolResult) -> Option<Vec<Citation>> {
    let ToolResult::Json(Value::Array(records)) = result else {
        return None;
    };

    let citations: Vec<Citation> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| is_document_record(record))
        .filter_map(|(index, record)| citation_from_record(index, record))
        .collect();

    (!citations.is_empty()).then_some(citations)
}

/// Citations from a non-streaming `references` list.
///
/// Entries are either documents or `{query, references: [...]}` groups.
/// Every object entry becomes a citation, with placeholders for missing fields.
#[must_use]
pub fn citations_from_references(references: &Value) -> Vec<Citation> {
    let Some(entries) = references.as_array() else {
        return Vec::new();
    };

    let documents: Vec<&Value> = entries
        .iter()
        .flat_map(|entry| match entry.get("references").and_then(Value::as_array) {
            Some(nested) => nested.iter().collect(),
            None => vec![entry],
        })
        .collect();

    documents
        .into_iter()
        .enumerate()
        .filter_map(|(index, doc)| citation_from_record(index, doc))
        .collect()
}

fn is_document_record(record: &Value) -> bool {
    record
        .as_object()
        .is_some_and(|obj| ["content", "text", "name"].iter().any(|k| obj.contains_key(*k)))
}

fn citation_from_record(index: usize, record: &Value) -> Option<Citation> {
    let obj = record.as_object()?;

    let meta = obj
        .get("meta_data")
        .or_else(|| obj.get("metadata"))
        .and_then(Value::as_object);

    let document_id = str_of(obj, &["document_id", "id"])
        .or_else(|| meta.and_then(|m| str_of(m, &["document_id"])))
        .unwrap_or_else(|| format!("doc-{index}"));

    let document_name = str_of(obj, &["name", "document_name"])
        .or_else(|| meta.and_then(|m| str_of(m, &["name"])))
        .unwrap_or_else(|| "Unknown".to_string());

    let chunk_text = str_of(obj, &["content", "chunk_text", "text"]).unwrap_or_default();

    let relevance_score = ["score", "relevance_score", "reranking_score"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_f64))
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    Some(Citation {
        document_id,
        document_name,
        chunk_text,
        relevance_score,
    })
}

/// First string (or number, as text) among `keys`.
fn str_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
