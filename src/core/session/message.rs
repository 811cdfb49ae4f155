//! Conversation history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::new_message_id;
use crate::core::stream::AssistantMessage;

/// One entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    /// Text the user submitted.
    User(UserMessage),
    /// Reply assembled from a run.
    Assistant(AssistantMessage),
}

impl ChatMessage {
    /// Create a user message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(UserMessage {
            id: new_message_id(),
            content: content.into(),
            created_at: Utc::now(),
        })
    }

    /// Get the message ID.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::User(m) => &m.id,
            Self::Assistant(m) => &m.id,
        }
    }

    /// Message text.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::User(m) => &m.content,
            Self::Assistant(m) => &m.content,
        }
    }

    /// Check if this is a user message.
    #[must_use]
    pub const fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// The assistant reply, if this is one.
    #[must_use]
    pub const fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Self::User(_) => None,
            Self::Assistant(m) => Some(m),
        }
    }
}

/// User message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
