// chat-server/src/interceptor.rs
//! Per-frame authentication on the persistent connection.
//!
//! CONNECT and SEND frames carry their own `Authorization: Bearer <token>`
//! header and are authenticated one by one; nothing is remembered between
//! frames, so a token that expires mid-connection stops working at the
//! next frame. Every other frame type passes through untouched.

use forum_common::models::Principal;
use forum_common::store::{resolve_principal, CredentialStore};
use forum_common::{bearer_token, ServiceError, TokenCodec, TokenError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::frame::{Command, Frame};

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Why a gated frame was dropped. Only ever logged.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("no Authorization header")]
    MissingAuthorization,

    #[error("Authorization header is not a bearer token")]
    NotBearer,

    #[error("token rejected: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("principal lookup failed: {0}")]
    Lookup(#[from] ServiceError),
}

/// A frame together with the principal that authenticated it.
#[derive(Debug, Clone)]
pub struct AuthenticatedFrame {
    frame: Frame,
    principal: Principal,
}

impl AuthenticatedFrame {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn sender_identity(&self) -> &str {
        self.principal.identity_handle()
    }

    pub fn into_parts(self) -> (Frame, Principal) {
        (self.frame, self.principal)
    }
}

#[derive(Debug)]
pub enum Verdict {
    Authenticated(AuthenticatedFrame),
    /// Not a gated frame type; forwarded unchanged
    PassThrough(Frame),
    /// Must not reach any handler, and the sender is not told
    Drop(Rejection),
}

pub fn requires_authentication(command: Command) -> bool {
    matches!(command, Command::Connect | Command::Stomp | Command::Send)
}

pub struct ChannelAuthInterceptor {
    codec: Arc<TokenCodec>,
    credentials: Arc<dyn CredentialStore>,
    lookup_timeout: Duration,
}

impl ChannelAuthInterceptor {
    pub fn new(codec: Arc<TokenCodec>, credentials: Arc<dyn CredentialStore>, lookup_timeout: Duration) -> Self {
        Self {
            codec,
            credentials,
            lookup_timeout,
        }
    }

    pub async fn intercept(&self, frame: Frame) -> Verdict {
        if !requires_authentication(frame.command()) {
            return Verdict::PassThrough(frame);
        }

        match self.authenticate(&frame).await {
            Ok(principal) => {
                tracing::debug!("{} frame authenticated as {}", frame.command(), principal.identity_handle());
                Verdict::Authenticated(AuthenticatedFrame { frame, principal })
            }
            Err(rejection) => {
                tracing::warn!("Dropping {} frame: {}", frame.command(), rejection);
                Verdict::Drop(rejection)
            }
        }
    }

    async fn authenticate(&self, frame: &Frame) -> Result<Principal, Rejection> {
        let authorization = frame
            .header(AUTHORIZATION_HEADER)
            .or_else(|| frame.header("authorization"))
            .ok_or(Rejection::MissingAuthorization)?;
        let token = bearer_token(authorization).ok_or(Rejection::NotBearer)?;

        // verifies signature, algorithm and expiry before yielding claims
        let claims = self.codec.decode(token)?;

        let principal = resolve_principal(self.credentials.as_ref(), &claims.subject, self.lookup_timeout).await?;
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn connect(authorization: Option<&str>) -> Frame {
        let frame = Frame::new(Command::Connect).with_header("accept-version", "1.2");
        match authorization {
            Some(value) => frame.with_header(AUTHORIZATION_HEADER, value),
            None => frame,
        }
    }

    #[actix_web::test]
    async fn authenticates_connect_with_valid_bearer() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let token = fixture.token(&alice);

        match fixture.interceptor().intercept(connect(Some(&format!("Bearer {}", token)))).await {
            Verdict::Authenticated(frame) => {
                assert_eq!(frame.sender_identity(), "a@x.com");
                assert_eq!(frame.principal().id(), alice.id());
            }
            other => panic!("expected authentication, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn drops_gated_frames_without_bearer() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let token = fixture.token(&alice);
        let interceptor = fixture.interceptor();

        let missing = interceptor.intercept(connect(None)).await;
        assert!(matches!(missing, Verdict::Drop(Rejection::MissingAuthorization)));

        let basic = interceptor.intercept(connect(Some(&format!("Basic {}", token)))).await;
        assert!(matches!(basic, Verdict::Drop(Rejection::NotBearer)));

        let empty = interceptor.intercept(connect(Some("Bearer "))).await;
        assert!(matches!(empty, Verdict::Drop(Rejection::InvalidToken(TokenError::Empty))));

        let send = Frame::new(Command::Send).with_header("destination", "/app/chat.send");
        assert!(matches!(interceptor.intercept(send).await, Verdict::Drop(_)));
    }

    #[actix_web::test]
    async fn drops_expired_send() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let send = Frame::new(Command::Send)
            .with_header("destination", "/app/chat.send")
            .with_header(AUTHORIZATION_HEADER, format!("Bearer {}", fixture.expired_token(&alice)));

        let verdict = fixture.interceptor().intercept(send).await;
        assert!(matches!(verdict, Verdict::Drop(Rejection::InvalidToken(TokenError::Expired))));
    }

    #[actix_web::test]
    async fn drops_token_of_unknown_subject() {
        let fixture = Fixture::new();
        let ghost = Principal::new(99, "ghost@x.com", []);
        let frame = connect(Some(&format!("Bearer {}", fixture.token(&ghost))));

        let verdict = fixture.interceptor().intercept(frame).await;
        assert!(matches!(verdict, Verdict::Drop(Rejection::Lookup(ServiceError::NotFound(_)))));
    }

    #[actix_web::test]
    async fn other_frames_pass_through_unchanged() {
        let fixture = Fixture::new();
        let subscribe = Frame::new(Command::Subscribe)
            .with_header("id", "sub-0")
            .with_header("destination", "/topic/forum.1");

        match fixture.interceptor().intercept(subscribe.clone()).await {
            Verdict::PassThrough(frame) => assert_eq!(frame, subscribe),
            other => panic!("expected pass-through, got {:?}", other),
        }
    }
}
