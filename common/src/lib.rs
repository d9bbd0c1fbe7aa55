pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod password;
pub mod store;
pub mod token;
pub mod utils;

pub use self::config::*;
pub use error::{ServiceError, StoreError};
pub use messages::*;
pub use token::{bearer_token, TokenClaims, TokenCodec, TokenError, BEARER_PREFIX};
pub use utils::*;
