use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::user::{UserId, UserSummary};
use crate::utils::serde_helpers::{lenient_id, null_as_default};

pub type ConversationId = i64;
pub type MessageId = i64;

/// Preview of the newest message, as shown in the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender_username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(with = "lenient_id")]
    pub id: ConversationId,
    pub other_user: UserSummary,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unread_count: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    /// Preview line, prefixed with "You: " when the current user wrote the last message.
    pub fn preview(&self, current_username: Option<&str>) -> Option<String> {
        self.last_message.as_ref().map(|last| {
            if current_username == Some(last.sender_username.as_str()) {
                format!("You: {}", last.content)
            } else {
                last.content.clone()
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(with = "lenient_id")]
    pub id: MessageId,
    #[serde(default)]
    pub conversation: Option<ConversationId>,
    #[serde(with = "lenient_id")]
    pub sender: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    pub fn is_own(&self, current_user: Option<UserId>) -> bool {
        current_user == Some(self.sender)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// How a conversation is opened: by its id, or by the username of the other party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationTarget {
    Id(ConversationId),
    Username(String),
}

impl From<ConversationId> for ConversationTarget {
    fn from(id: ConversationId) -> Self {
        ConversationTarget::Id(id)
    }
}

impl From<&str> for ConversationTarget {
    fn from(username: &str) -> Self {
        ConversationTarget::Username(username.to_string())
    }
}
