// web-server/src/state.rs
use forum_chat::MessageRouter;
use forum_common::store::{ChatPersistence, CredentialStore, ForumLookup};
use forum_common::TokenCodec;
use std::sync::Arc;
use std::time::Duration;

/// Handles shared by every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub credentials: Arc<dyn CredentialStore>,
    pub forums: Arc<dyn ForumLookup>,
    pub messages: Arc<dyn ChatPersistence>,
    pub router: Arc<MessageRouter>,
    pub store_timeout: Duration,
}
