// chat-server/src/destination.rs
use std::fmt;

/// Inbound destination of chat SEND frames
pub const CHAT_SEND_DESTINATION: &str = "/app/chat.send";

pub const FORUM_TOPIC_PREFIX: &str = "/topic/forum.";
pub const USER_PREFIX: &str = "/user/";
pub const PRIVATE_SUFFIX: &str = "/private";

/// Where the broker delivers a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Fan-out to every subscriber of one forum
    Forum(i64),
    /// Connections authenticated as one identity
    Private(String),
}

impl Destination {
    pub fn forum(forum_id: i64) -> Self {
        Destination::Forum(forum_id)
    }

    pub fn private(identity: impl Into<String>) -> Self {
        Destination::Private(identity.into())
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Destination::Forum(_))
    }

    /// Resolve the destination header of a SUBSCRIBE frame.
    ///
    /// `/user/private` resolves against the identity bound to the
    /// connection. An explicit `/user/{identity}/private` is only accepted
    /// for that same identity. Returns `None` for anything else.
    pub fn for_subscription(raw: &str, connection_identity: Option<&str>) -> Option<Self> {
        if let Some(id) = raw.strip_prefix(FORUM_TOPIC_PREFIX) {
            return id.parse::<i64>().ok().map(Destination::Forum);
        }

        let identity = connection_identity?;
        let rest = raw.strip_prefix(USER_PREFIX)?;
        if rest == &PRIVATE_SUFFIX[1..] {
            return Some(Destination::private(identity));
        }

        match rest.strip_suffix(PRIVATE_SUFFIX) {
            Some(named) if named == identity => Some(Destination::private(identity)),
            _ => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Forum(id) => write!(f, "{}{}", FORUM_TOPIC_PREFIX, id),
            Destination::Private(identity) => write!(f, "{}{}{}", USER_PREFIX, identity, PRIVATE_SUFFIX),
        }
    }
}
