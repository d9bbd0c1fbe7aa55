// common/src/models/principal.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::user::UserAccount;

/// Authorization role carried by a principal and inside issued tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Verified identity attached to one request or one frame.
///
/// Built only from a stored [`UserAccount`], never from token claims alone,
/// and never mutated once attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: i64,
    identity_handle: String,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(id: i64, identity_handle: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            identity_handle: identity_handle.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The login email; also the token subject and the private address key
    pub fn identity_handle(&self) -> &str {
        &self.identity_handle
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl From<&UserAccount> for Principal {
    fn from(account: &UserAccount) -> Self {
        Principal::new(account.id, account.email.clone(), account.roles.iter().copied())
    }
}
