// common/src/messages.rs
//! Payloads exchanged with clients, over HTTP and inside SEND frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Forum, Role, UserAccount};

/// Body of a SEND to the chat destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub forum_id: i64,
    pub content: String,
    /// Identity handle of the recipient; blank or absent means public
    #[serde(default)]
    pub recipient_email: Option<String>,
}

impl ChatRequest {
    pub fn public(forum_id: i64, content: impl Into<String>) -> Self {
        Self {
            forum_id,
            content: content.into(),
            recipient_email: None,
        }
    }

    pub fn private(forum_id: i64, content: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            forum_id,
            content: content.into(),
            recipient_email: Some(recipient.into()),
        }
    }

    /// The recipient handle, if one was actually given
    pub fn recipient(&self) -> Option<&str> {
        self.recipient_email
            .as_deref()
            .map(str::trim)
            .filter(|handle| !handle.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumRequest {
    pub title: String,
    pub description: String,
}

/// Body of `POST /api/forums/{id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Forum> for ForumResponse {
    fn from(forum: &Forum) -> Self {
        Self {
            id: forum.id,
            title: forum.title.clone(),
            description: forum.description.clone(),
            creator_id: forum.creator_id,
            created_at: forum.created_at,
        }
    }
}

/// Account as shown to clients; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserResponse {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            roles: account.roles.iter().copied().collect(),
            created_at: account.created_at,
        }
    }
}

/// Body of `PUT /api/users/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_recipient_means_public() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"forumId":1,"content":"hi","recipientEmail":"  "}"#).unwrap();
        assert_eq!(request.recipient(), None);

        let request: ChatRequest = serde_json::from_str(r#"{"forumId":1,"content":"hi"}"#).unwrap();
        assert_eq!(request.recipient(), None);

        let request: ChatRequest =
            serde_json::from_str(r#"{"forumId":1,"content":"hi","recipientEmail":"b@x.com"}"#).unwrap();
        assert_eq!(request.recipient(), Some("b@x.com"));
    }
}
