//! Wire types for the AgentOS REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::stream::{AssistantMessage, Citation, citations_from_references};

/// Input for one agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub agent_id: String,
    pub message: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

impl RunRequest {
    pub fn new(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            message: message.into(),
            session_id: None,
            user_id: None,
        }
    }

    /// Form fields for the runs endpoint.
    pub(crate) fn form(&self, stream: bool) -> Vec<(&'static str, String)> {
        let mut fields = vec![("message", self.message.clone())];
        if let Some(session_id) = &self.session_id {
            fields.push(("session_id", session_id.clone()));
        }
        if let Some(user_id) = &self.user_id {
            fields.push(("user_id", user_id.clone()));
        }
        fields.push(("stream", stream.to_string()));
        fields
    }
}

/// Result of a non-streaming run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub run_id: Option<String>,
    pub session_id: Option<String>,
    pub content: String,
    pub citations: Vec<Citation>,
}

impl RunOutput {
    /// Read a run response, tolerating missing fields.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| match value.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Self {
            run_id: text("run_id"),
            session_id: text("session_id"),
            content: text("content").or_else(|| text("message")).unwrap_or_default(),
            citations: value
                .get("references")
                .map(citations_from_references)
                .unwrap_or_default(),
        }
    }

    /// View this output as a finished assistant message.
    #[must_use]
    pub fn into_message(self, id: impl Into<String>) -> AssistantMessage {
        let mut message = AssistantMessage::new(id);
        message.run_id = self.run_id;
        message.content = self.content;
        message.citations = (!self.citations.is_empty()).then_some(self.citations);
        message.complete = true;
        message
    }
}

/// An entry in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeContent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A backend conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSession {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_includes_optional_fields_when_set() {
        let mut req = RunRequest::new("helpdesk-assistant", "hi");
        assert_eq!(
            req.form(true),
            vec![("message", "hi".to_string()), ("stream", "true".to_string())]
        );

        req.session_id = Some("s1".into());
        req.user_id = Some("u1".into());
        let fields = req.form(false);
        assert!(fields.contains(&("session_id", "s1".to_string())));
        assert!(fields.contains(&("user_id", "u1".to_string())));
        assert_eq!(fields.last(), Some(&("stream", "false".to_string())));
    }

    #[test]
    fn run_output_reads_references() {
        let output = RunOutput::from_value(&json!({
            "run_id": "r1",
            "session_id": "s1",
            "content": "We are open 9-5.",
            "references": [{"query": "hours", "references": [{"name": "faq.md", "content": "9-5", "score": 0.7}]}]
        }));

        assert_eq!(output.session_id.as_deref(), Some("s1"));
        assert_eq!(output.content, "We are open 9-5.");
        assert_eq!(output.citations.len(), 1);
        assert_eq!(output.citations[0].document_name, "faq.md");
    }

    #[test]
    fn run_output_falls_back_to_message() {
        let output = RunOutput::from_value(&json!({"message": "fallback", "references": null}));
        assert_eq!(output.content, "fallback");
        assert!(output.citations.is_empty());

        let message = output.into_message("m1");
        assert!(message.complete);
        assert!(message.citations.is_none());
    }

    #[test]
    fn knowledge_content_keeps_unknown_fields() {
        let content: KnowledgeContent = serde_json::from_value(json!({
            "id": "c1",
            "name": "pricing.pdf",
            "status": "completed",
            "size": 1024
        }))
        .unwrap();
        assert_eq!(content.name.as_deref(), Some("pricing.pdf"));
        assert_eq!(content.extra.get("size"), Some(&json!(1024)));
    }
}
