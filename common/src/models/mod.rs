// common/src/models/mod.rs
pub mod forum;
pub mod message;
pub mod principal;
pub mod user;

pub use forum::{Forum, NewForum};
pub use message::{ChatMessage, MessageType, NewChatMessage};
pub use principal::{Principal, Role};
pub use user::{NewUserAccount, UserAccount, UserUpdate};
