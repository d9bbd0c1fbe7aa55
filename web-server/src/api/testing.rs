// web-server/src/api/testing.rs
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderName};
use actix_web::{web, App, Error};
use chrono::Duration as ChronoDuration;
use forum_chat::{Destination, MessageDispatcher, MessageRouter};
use forum_common::models::{ChatMessage, Forum, NewForum, NewUserAccount, Principal, Role};
use forum_common::password::hash_password;
use forum_common::store::{InMemoryCredentialStore, InMemoryForumStore, InMemoryMessageStore};
use forum_common::{ChatRequest, TokenCodec};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::middleware::AuthenticationGate;
use crate::state::AppState;

const KEY: &[u8] = b"api-test-signing-key-api-test-signing";

#[derive(Default)]
pub struct RecordingDispatcher {
    destinations: Mutex<Vec<Destination>>,
}

impl RecordingDispatcher {
    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations.lock().unwrap().clone()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn dispatch(&self, destination: &Destination, _message: &ChatMessage) {
        self.destinations.lock().unwrap().push(destination.clone());
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl TestHarness {
    pub fn new() -> Self {
        let timeout = Duration::from_secs(1);
        let codec = Arc::new(TokenCodec::new(KEY, ChronoDuration::hours(1)).unwrap());
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let forums = Arc::new(InMemoryForumStore::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let router = Arc::new(MessageRouter::new(
            credentials.clone(),
            forums.clone(),
            messages.clone(),
            dispatcher.clone(),
            timeout,
        ));

        Self {
            state: AppState {
                codec,
                credentials,
                forums,
                messages,
                router,
                store_timeout: timeout,
            },
            dispatcher,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        let gate = AuthenticationGate::new(
            self.state.codec.clone(),
            self.state.credentials.clone(),
            self.state.store_timeout,
        )
        .with_default_exclusions("/ws");

        App::new()
            .app_data(web::Data::new(self.state.clone()))
            .wrap(gate)
            .configure(super::configure)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Principal {
        self.insert(username, email, hash_password(password).unwrap(), Role::User).await
    }

    pub async fn register_with_role(&self, username: &str, email: &str, role: Role) -> Principal {
        self.insert(username, email, hash_password("secret").unwrap(), role).await
    }

    async fn insert(&self, username: &str, email: &str, password_hash: String, role: Role) -> Principal {
        let account = self
            .state
            .credentials
            .insert(NewUserAccount {
                username: username.into(),
                email: email.into(),
                password_hash,
                roles: [role].into_iter().collect(),
            })
            .await
            .unwrap();
        Principal::from(&account)
    }

    pub async fn forum(&self, title: &str, creator: &Principal) -> Forum {
        self.state
            .forums
            .create(NewForum {
                title: title.into(),
                description: String::new(),
                creator_id: creator.id(),
            })
            .await
            .unwrap()
    }

    pub async fn public_message(&self, sender: &Principal, forum_id: i64, content: &str) -> ChatMessage {
        self.state
            .router
            .route(sender, ChatRequest::public(forum_id, content))
            .await
            .unwrap()
    }

    pub async fn private_message(&self, sender: &Principal, forum_id: i64, recipient: &str, content: &str) -> ChatMessage {
        self.state
            .router
            .route(sender, ChatRequest::private(forum_id, content, recipient))
            .await
            .unwrap()
    }

    pub fn bearer(&self, principal: &Principal) -> (HeaderName, String) {
        (
            header::AUTHORIZATION,
            format!("Bearer {}", self.state.codec.issue(principal).unwrap()),
        )
    }
}
