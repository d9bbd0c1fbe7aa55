// common/src/store/mod.rs
//! Storage seams used by the authentication and routing core.
//!
//! The core only needs lookups and an append-only message log; anything
//! with read-committed semantics can sit behind these traits.

pub mod memory;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{ServiceError, StoreError};
use crate::models::{ChatMessage, Forum, NewChatMessage, NewForum, NewUserAccount, Principal, UserAccount, UserUpdate};
use crate::utils::with_timeout;

pub use memory::{InMemoryCredentialStore, InMemoryForumStore, InMemoryMessageStore};

/// User accounts, keyed by id and by login email.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>, StoreError>;

    /// All accounts, by id
    async fn list(&self) -> Result<Vec<UserAccount>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email or username is taken
    async fn insert(&self, account: NewUserAccount) -> Result<UserAccount, StoreError>;

    /// `Ok(None)` when there is no such account. Uniqueness is enforced as
    /// on insert.
    async fn update(&self, id: i64, changes: UserUpdate) -> Result<Option<UserAccount>, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ForumLookup: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<Forum>, StoreError>;

    async fn list(&self) -> Result<Vec<Forum>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the title is taken
    async fn create(&self, forum: NewForum) -> Result<Forum, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// Append-only message log.
#[async_trait]
pub trait ChatPersistence: Send + Sync {
    /// Assigns `id` and `sent_at`
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError>;

    /// All messages of a forum, oldest first
    async fn history(&self, forum_id: i64) -> Result<Vec<ChatMessage>, StoreError>;
}

/// Look up the account behind an identity handle and map it to a principal.
pub async fn resolve_principal(
    store: &dyn CredentialStore,
    identity_handle: &str,
    limit: Duration,
) -> Result<Principal, ServiceError> {
    with_timeout(limit, store.find_by_email(identity_handle))
        .await?
        .map(|account| Principal::from(&account))
        .ok_or_else(|| ServiceError::not_found(format!("user {}", identity_handle)))
}
