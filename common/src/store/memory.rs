// common/src/store/memory.rs
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::{ChatPersistence, CredentialStore, ForumLookup};
use crate::error::StoreError;
use crate::models::{ChatMessage, Forum, NewChatMessage, NewForum, NewUserAccount, UserAccount, UserUpdate};

/// Process-local account store
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: DashMap<i64, UserAccount>,
    // Unique indexes
    emails: DashMap<String, i64>,
    usernames: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let id = match self.emails.get(email) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, account: NewUserAccount) -> Result<UserAccount, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict("email".into())),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        match self.usernames.entry(account.username.clone()) {
            Entry::Occupied(_) => {
                self.emails.remove(&account.email);
                return Err(StoreError::Conflict("username".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let stored = UserAccount {
            id,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            roles: account.roles,
            created_at: Utc::now(),
        };
        self.accounts.insert(id, stored.clone());

        tracing::debug!("Account {} stored for {}", id, stored.email);
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let mut accounts: Vec<UserAccount> = self.accounts.iter().map(|entry| entry.value().clone()).collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }

    async fn update(&self, id: i64, changes: UserUpdate) -> Result<Option<UserAccount>, StoreError> {
        let current = match self.accounts.get(&id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        let email = changes.email.filter(|email| *email != current.email);
        let username = changes.username.filter(|username| *username != current.username);

        // Reserve the new keys first so a conflict leaves everything untouched
        if let Some(email) = &email {
            match self.emails.entry(email.clone()) {
                Entry::Occupied(_) => return Err(StoreError::Conflict("email".into())),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }
        if let Some(username) = &username {
            match self.usernames.entry(username.clone()) {
                Entry::Occupied(_) => {
                    if let Some(email) = &email {
                        self.emails.remove(email);
                    }
                    return Err(StoreError::Conflict("username".into()));
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        let mut entry = match self.accounts.get_mut(&id) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let account = entry.value_mut();
        if let Some(email) = email {
            self.emails.remove(&account.email);
            account.email = email;
        }
        if let Some(username) = username {
            self.usernames.remove(&account.username);
            account.username = username;
        }

        tracing::debug!("Account {} updated", id);
        Ok(Some(account.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        match self.accounts.remove(&id) {
            Some((_, account)) => {
                self.emails.remove(&account.email);
                self.usernames.remove(&account.username);
                tracing::debug!("Account {} deleted", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Process-local forum store
#[derive(Default)]
pub struct InMemoryForumStore {
    forums: DashMap<i64, Forum>,
    titles: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl InMemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ForumLookup for InMemoryForumStore {
    async fn find(&self, id: i64) -> Result<Option<Forum>, StoreError> {
        Ok(self.forums.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Forum>, StoreError> {
        let mut forums: Vec<Forum> = self.forums.iter().map(|entry| entry.value().clone()).collect();
        forums.sort_by_key(|forum| forum.id);
        Ok(forums)
    }

    async fn create(&self, forum: NewForum) -> Result<Forum, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        match self.titles.entry(forum.title.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict("forum title".into())),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let stored = Forum {
            id,
            title: forum.title,
            description: forum.description,
            creator_id: forum.creator_id,
            created_at: Utc::now(),
        };
        self.forums.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        match self.forums.remove(&id) {
            Some((_, forum)) => {
                self.titles.remove(&forum.title);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Process-local append-only message log, partitioned by forum
#[derive(Default)]
pub struct InMemoryMessageStore {
    by_forum: DashMap<i64, Vec<ChatMessage>>,
    next_id: AtomicI64,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages across all forums
    pub fn len(&self) -> usize {
        self.by_forum.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChatPersistence for InMemoryMessageStore {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut log = self.by_forum.entry(message.forum_id()).or_default();
        // Stamped under the partition lock so the log stays time ordered
        let stored = message.into_stored(id, Utc::now());
        log.push(stored.clone());
        Ok(stored)
    }

    async fn history(&self, forum_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let mut messages = self
            .by_forum
            .get(&forum_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        messages.sort_by(|a, b| a.sent_at().cmp(&b.sent_at()).then(a.id().cmp(&b.id())));
        Ok(messages)
    }
}
