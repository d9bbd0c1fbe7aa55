// common/src/models/user.rs
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::principal::Role;

/// Stored user row. Holds the password hash, so it never leaves the store
/// boundary; handlers work with [`super::principal::Principal`] instead.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
}

/// Profile changes; `None` leaves the field as it is
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}
