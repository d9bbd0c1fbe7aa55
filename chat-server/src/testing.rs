// chat-server/src/testing.rs
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use forum_common::models::{ChatMessage, Forum, NewChatMessage, NewForum, NewUserAccount, Principal, Role};
use forum_common::store::{
    ChatPersistence, CredentialStore, ForumLookup, InMemoryCredentialStore, InMemoryForumStore, InMemoryMessageStore,
};
use forum_common::{StoreError, TokenCodec};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::destination::Destination;
use crate::inbound::InboundPipeline;
use crate::interceptor::ChannelAuthInterceptor;
use crate::router::{MessageDispatcher, MessageRouter};

const KEY: &[u8] = b"test-signing-key-test-signing-key";

/// Remembers every dispatch instead of delivering it
#[derive(Default)]
pub struct RecordingDispatcher {
    deliveries: Mutex<Vec<(Destination, ChatMessage)>>,
}

impl RecordingDispatcher {
    pub fn deliveries(&self) -> Vec<(Destination, ChatMessage)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.deliveries().into_iter().map(|(destination, _)| destination).collect()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn dispatch(&self, destination: &Destination, message: &ChatMessage) {
        self.deliveries
            .lock()
            .unwrap()
            .push((destination.clone(), message.clone()));
    }
}

pub struct FailingMessageStore;

#[async_trait]
impl ChatPersistence for FailingMessageStore {
    async fn save(&self, _message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn history(&self, _forum_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }
}

pub struct Fixture {
    pub codec: Arc<TokenCodec>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub forums: Arc<InMemoryForumStore>,
    pub messages: Arc<InMemoryMessageStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            codec: Arc::new(TokenCodec::new(KEY, ChronoDuration::hours(1)).unwrap()),
            credentials: Arc::new(InMemoryCredentialStore::new()),
            forums: Arc::new(InMemoryForumStore::new()),
            messages: Arc::new(InMemoryMessageStore::new()),
            dispatcher: Arc::new(RecordingDispatcher::default()),
        }
    }

    pub async fn register(&self, username: &str, email: &str) -> Principal {
        let account = self
            .credentials
            .insert(NewUserAccount {
                username: username.into(),
                email: email.into(),
                password_hash: "unused".into(),
                roles: [Role::User].into_iter().collect(),
            })
            .await
            .unwrap();
        Principal::from(&account)
    }

    pub async fn forum(&self, title: &str, creator: &Principal) -> Forum {
        self.forums
            .create(NewForum {
                title: title.into(),
                description: format!("{} forum", title),
                creator_id: creator.id(),
            })
            .await
            .unwrap()
    }

    pub fn token(&self, principal: &Principal) -> String {
        self.codec.issue(principal).unwrap()
    }

    /// Issued two hours ago with a one hour lifetime
    pub fn expired_token(&self, principal: &Principal) -> String {
        self.codec
            .issue_at(principal, Utc::now() - ChronoDuration::hours(2))
            .unwrap()
    }

    pub fn interceptor(&self) -> ChannelAuthInterceptor {
        ChannelAuthInterceptor::new(self.codec.clone(), self.credentials.clone(), Duration::from_secs(1))
    }

    pub fn router(&self) -> MessageRouter {
        MessageRouter::new(
            self.credentials.clone(),
            self.forums.clone(),
            self.messages.clone(),
            self.dispatcher.clone(),
            Duration::from_secs(1),
        )
    }

    pub fn pipeline(&self) -> InboundPipeline {
        InboundPipeline::new(self.interceptor(), Arc::new(self.router()))
    }
}
