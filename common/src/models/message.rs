// common/src/models/message.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Public,
    Private,
}

/// A persisted chat message. `recipient_id` is set exactly when the
/// message is private; [`NewChatMessage::into_stored`] builds one, and
/// deserialization rejects anything breaking that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireChatMessage")]
pub struct ChatMessage {
    id: i64,
    forum_id: i64,
    sender_id: i64,
    recipient_id: Option<i64>,
    content: String,
    #[serde(rename = "type")]
    message_type: MessageType,
    sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn forum_id(&self) -> i64 {
        self.forum_id
    }

    pub fn sender_id(&self) -> i64 {
        self.sender_id
    }

    pub fn recipient_id(&self) -> Option<i64> {
        self.recipient_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn is_private(&self) -> bool {
        self.message_type == MessageType::Private
    }

    /// Whether the given user sent or received this message
    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.recipient_id == Some(user_id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChatMessage {
    id: i64,
    forum_id: i64,
    sender_id: i64,
    recipient_id: Option<i64>,
    content: String,
    #[serde(rename = "type")]
    message_type: MessageType,
    sent_at: DateTime<Utc>,
}

impl TryFrom<WireChatMessage> for ChatMessage {
    type Error = String;

    fn try_from(wire: WireChatMessage) -> Result<Self, Self::Error> {
        let new = match (wire.message_type, wire.recipient_id) {
            (MessageType::Public, None) => NewChatMessage::public(wire.forum_id, wire.sender_id, wire.content),
            (MessageType::Private, Some(recipient_id)) => {
                NewChatMessage::private(wire.forum_id, wire.sender_id, recipient_id, wire.content)
            }
            (MessageType::Public, Some(_)) => return Err("public message must not have a recipient".into()),
            (MessageType::Private, None) => return Err("private message needs a recipient".into()),
        };
        Ok(new.into_stored(wire.id, wire.sent_at))
    }
}

/// A message that has been classified but not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    forum_id: i64,
    sender_id: i64,
    recipient_id: Option<i64>,
    content: String,
}

impl NewChatMessage {
    pub fn public(forum_id: i64, sender_id: i64, content: impl Into<String>) -> Self {
        Self {
            forum_id,
            sender_id,
            recipient_id: None,
            content: content.into(),
        }
    }

    pub fn private(forum_id: i64, sender_id: i64, recipient_id: i64, content: impl Into<String>) -> Self {
        Self {
            forum_id,
            sender_id,
            recipient_id: Some(recipient_id),
            content: content.into(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        if self.recipient_id.is_some() {
            MessageType::Private
        } else {
            MessageType::Public
        }
    }

    pub fn forum_id(&self) -> i64 {
        self.forum_id
    }

    /// Called by a store once it has assigned identity and timestamp
    pub fn into_stored(self, id: i64, sent_at: DateTime<Utc>) -> ChatMessage {
        let message_type = self.message_type();
        ChatMessage {
            id,
            forum_id: self.forum_id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            content: self.content,
            message_type,
            sent_at,
        }
    }
}
