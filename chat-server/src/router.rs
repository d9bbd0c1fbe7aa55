// chat-server/src/router.rs
use forum_common::models::{ChatMessage, NewChatMessage, Principal};
use forum_common::store::{resolve_principal, ChatPersistence, CredentialStore, ForumLookup};
use forum_common::{with_timeout, ChatRequest, ServiceError};
use std::sync::Arc;
use std::time::Duration;

use crate::destination::Destination;

/// Longest accepted message body, in characters
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Hands a stored message to the transport. Best effort: no result.
pub trait MessageDispatcher: Send + Sync {
    fn dispatch(&self, destination: &Destination, message: &ChatMessage);
}

/// Where a classified message goes once it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Broadcast { forum_id: i64 },
    Private { sender: String, recipient: String },
}

impl Delivery {
    /// Public messages never reach a private address and vice versa.
    pub fn destinations(&self) -> Vec<Destination> {
        match self {
            Delivery::Broadcast { forum_id } => vec![Destination::forum(*forum_id)],
            Delivery::Private { sender, recipient } => vec![
                Destination::private(sender.clone()),
                Destination::private(recipient.clone()),
            ],
        }
    }
}

pub struct MessageRouter {
    credentials: Arc<dyn CredentialStore>,
    forums: Arc<dyn ForumLookup>,
    messages: Arc<dyn ChatPersistence>,
    dispatcher: Arc<dyn MessageDispatcher>,
    store_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        forums: Arc<dyn ForumLookup>,
        messages: Arc<dyn ChatPersistence>,
        dispatcher: Arc<dyn MessageDispatcher>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            forums,
            messages,
            dispatcher,
            store_timeout,
        }
    }

    /// Classify, persist once, then dispatch a chat message from `sender`.
    pub async fn route(&self, sender: &Principal, request: ChatRequest) -> Result<ChatMessage, ServiceError> {
        validate_content(&request.content)?;

        // The attached principal may be stale by now
        let sender = resolve_principal(self.credentials.as_ref(), sender.identity_handle(), self.store_timeout).await?;

        let forum = with_timeout(self.store_timeout, self.forums.find(request.forum_id))
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("forum {}", request.forum_id)))?;

        let recipient_handle = request.recipient().map(str::to_string);
        let (message, delivery) = match recipient_handle.as_deref() {
            Some(handle) => {
                let recipient = resolve_principal(self.credentials.as_ref(), handle, self.store_timeout).await?;
                tracing::info!("Private message in forum {} from {} to {}", forum.id, sender.identity_handle(), handle);
                (
                    NewChatMessage::private(forum.id, sender.id(), recipient.id(), request.content),
                    Delivery::Private {
                        sender: sender.identity_handle().to_string(),
                        recipient: recipient.identity_handle().to_string(),
                    },
                )
            }
            None => {
                tracing::info!("Public message in forum {} from {}", forum.id, sender.identity_handle());
                (
                    NewChatMessage::public(forum.id, sender.id(), request.content),
                    Delivery::Broadcast { forum_id: forum.id },
                )
            }
        };

        let stored = with_timeout(self.store_timeout, self.messages.save(message))
            .await
            .map_err(|e| {
                tracing::error!("Failed to persist message in forum {}: {}", forum.id, e);
                e
            })?;

        for destination in delivery.destinations() {
            tracing::debug!("Dispatching message {} to {}", stored.id(), destination);
            self.dispatcher.dispatch(&destination, &stored);
        }

        Ok(stored)
    }
}

fn validate_content(content: &str) -> Result<(), ServiceError> {
    if content.trim().is_empty() {
        return Err(ServiceError::invalid("content must not be blank"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ServiceError::invalid(format!(
            "content exceeds {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(())
}
