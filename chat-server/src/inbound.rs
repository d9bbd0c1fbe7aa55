// chat-server/src/inbound.rs
//! What happens to one decoded client frame.
//!
//! The pipeline is transport agnostic: the connection actor feeds it frames
//! and applies the returned [`Outcome`]. Nothing here writes to the socket,
//! so a dropped frame really produces no traffic at all.

use forum_common::models::{ChatMessage, Principal};
use forum_common::ChatRequest;
use std::sync::Arc;

use crate::destination::{Destination, CHAT_SEND_DESTINATION};
use crate::frame::{Command, Frame};
use crate::interceptor::{AuthenticatedFrame, ChannelAuthInterceptor, Verdict};
use crate::router::MessageRouter;

const SUPPORTED_VERSIONS: [&str; 3] = ["1.2", "1.1", "1.0"];

#[derive(Debug)]
pub enum Outcome {
    Connected {
        principal: Principal,
        reply: Frame,
    },
    Routed {
        message: ChatMessage,
        receipt: Option<String>,
    },
    Subscribed {
        subscription_id: String,
        destination: Destination,
        /// Destination header as the client wrote it
        requested: String,
        receipt: Option<String>,
    },
    Unsubscribed {
        subscription_id: String,
        receipt: Option<String>,
    },
    Disconnected {
        receipt: Option<String>,
    },
    /// Failed authentication
    Dropped,
    /// Authenticated or ungated, but unusable
    Discarded,
    /// Frame types this server does not act on
    Ignored,
}

impl Outcome {
    pub fn receipt(&self) -> Option<&str> {
        match self {
            Outcome::Routed { receipt, .. }
            | Outcome::Subscribed { receipt, .. }
            | Outcome::Unsubscribed { receipt, .. }
            | Outcome::Disconnected { receipt } => receipt.as_deref(),
            _ => None,
        }
    }
}

pub struct InboundPipeline {
    interceptor: ChannelAuthInterceptor,
    router: Arc<MessageRouter>,
}

impl InboundPipeline {
    pub fn new(interceptor: ChannelAuthInterceptor, router: Arc<MessageRouter>) -> Self {
        Self { interceptor, router }
    }

    /// `connection_identity` is the identity bound by the last successful
    /// CONNECT on this connection, used only to resolve `/user/private`.
    pub async fn process(&self, frame: Frame, connection_identity: Option<&str>) -> Outcome {
        match self.interceptor.intercept(frame).await {
            Verdict::Drop(_) => Outcome::Dropped,
            Verdict::Authenticated(frame) => self.authenticated(frame).await,
            Verdict::PassThrough(frame) => self.pass_through(frame, connection_identity),
        }
    }

    async fn authenticated(&self, frame: AuthenticatedFrame) -> Outcome {
        let (frame, principal) = frame.into_parts();

        if frame.command().is_connect() {
            let reply = connected_frame(&frame, &principal);
            return Outcome::Connected { principal, reply };
        }

        // only SEND remains among the gated commands
        let receipt = frame.header("receipt").map(str::to_string);
        if frame.header("destination") != Some(CHAT_SEND_DESTINATION) {
            tracing::warn!(
                "Discarding SEND from {} to unknown destination {:?}",
                principal.identity_handle(),
                frame.header("destination")
            );
            return Outcome::Discarded;
        }

        let request: ChatRequest = match serde_json::from_str(frame.body()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Discarding SEND from {}: bad payload: {}", principal.identity_handle(), e);
                return Outcome::Discarded;
            }
        };

        match self.router.route(&principal, request).await {
            Ok(message) => Outcome::Routed { message, receipt },
            Err(e) => {
                tracing::warn!("Discarding SEND from {}: {}", principal.identity_handle(), e);
                Outcome::Discarded
            }
        }
    }

    fn pass_through(&self, frame: Frame, connection_identity: Option<&str>) -> Outcome {
        let receipt = frame.header("receipt").map(str::to_string);

        match frame.command() {
            Command::Subscribe => {
                let (Some(id), Some(requested)) = (frame.header("id"), frame.header("destination")) else {
                    tracing::warn!("Discarding SUBSCRIBE without id or destination");
                    return Outcome::Discarded;
                };
                match Destination::for_subscription(requested, connection_identity) {
                    Some(destination) => Outcome::Subscribed {
                        subscription_id: id.to_string(),
                        destination,
                        requested: requested.to_string(),
                        receipt,
                    },
                    None => {
                        tracing::warn!(
                            "Discarding SUBSCRIBE to {} for connection identity {:?}",
                            requested,
                            connection_identity
                        );
                        Outcome::Discarded
                    }
                }
            }
            Command::Unsubscribe => match frame.header("id") {
                Some(id) => Outcome::Unsubscribed {
                    subscription_id: id.to_string(),
                    receipt,
                },
                None => Outcome::Discarded,
            },
            Command::Disconnect => Outcome::Disconnected { receipt },
            other => {
                tracing::debug!("Ignoring {} frame", other);
                Outcome::Ignored
            }
        }
    }
}

fn connected_frame(connect: &Frame, principal: &Principal) -> Frame {
    // STOMP 1.0 clients send no accept-version at all
    let version = connect
        .header("accept-version")
        .and_then(|accepted| {
            let accepted: Vec<&str> = accepted.split(',').map(str::trim).collect();
            SUPPORTED_VERSIONS.iter().find(|v| accepted.contains(*v)).copied()
        })
        .unwrap_or("1.0");

    Frame::new(Command::Connected)
        .with_header("version", version)
        .with_header("heart-beat", "0,0")
        .with_header("user-name", principal.identity_handle())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::AUTHORIZATION_HEADER;
    use crate::testing::Fixture;
    use forum_common::models::MessageType;

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    fn send(token: &str, body: &str) -> Frame {
        Frame::new(Command::Send)
            .with_header("destination", CHAT_SEND_DESTINATION)
            .with_header(AUTHORIZATION_HEADER, bearer(token))
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    #[actix_web::test]
    async fn connect_replies_connected_with_negotiated_version() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let frame = Frame::new(Command::Connect)
            .with_header("accept-version", "1.1,1.2")
            .with_header(AUTHORIZATION_HEADER, bearer(&fixture.token(&alice)));

        match fixture.pipeline().process(frame, None).await {
            Outcome::Connected { principal, reply } => {
                assert_eq!(principal.identity_handle(), "a@x.com");
                assert_eq!(reply.command(), Command::Connected);
                assert_eq!(reply.header("version"), Some("1.2"));
                assert_eq!(reply.header("user-name"), Some("a@x.com"));
            }
            other => panic!("expected CONNECTED, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn public_send_is_broadcast_to_forum_topic() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let forum = fixture.forum("general", &alice).await;
        let token = fixture.token(&alice);

        let body = format!(r#"{{"forumId":{},"content":"hi"}}"#, forum.id);
        let outcome = fixture.pipeline().process(send(&token, &body), None).await;

        let message = match outcome {
            Outcome::Routed { message, .. } => message,
            other => panic!("expected routed message, got {:?}", other),
        };
        assert_eq!(message.message_type(), MessageType::Public);
        assert_eq!(message.content(), "hi");
        assert_eq!(fixture.dispatcher.destinations(), vec![Destination::forum(forum.id)]);
        assert_eq!(fixture.dispatcher.destinations()[0].to_string(), format!("/topic/forum.{}", forum.id));
    }

    #[actix_web::test]
    async fn private_send_skips_the_forum_topic() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        fixture.register("bob", "b@x.com").await;
        let forum = fixture.forum("general", &alice).await;
        let token = fixture.token(&alice);

        let body = format!(r#"{{"forumId":{},"content":"hi","recipientEmail":"b@x.com"}}"#, forum.id);
        let outcome = fixture.pipeline().process(send(&token, &body), None).await;

        assert!(matches!(outcome, Outcome::Routed { ref message, .. } if message.message_type() == MessageType::Private));
        let destinations = fixture.dispatcher.destinations();
        assert_eq!(
            destinations,
            vec![Destination::private("a@x.com"), Destination::private("b@x.com")]
        );
        assert!(!destinations.contains(&Destination::forum(forum.id)));
    }

    #[actix_web::test]
    async fn expired_send_is_dropped_without_side_effects() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let forum = fixture.forum("general", &alice).await;

        let body = format!(r#"{{"forumId":{},"content":"hi"}}"#, forum.id);
        let outcome = fixture
            .pipeline()
            .process(send(&fixture.expired_token(&alice), &body), Some("a@x.com"))
            .await;

        assert!(matches!(outcome, Outcome::Dropped));
        assert!(outcome.receipt().is_none());
        assert!(fixture.messages.is_empty());
        assert!(fixture.dispatcher.deliveries().is_empty());
    }

    #[actix_web::test]
    async fn send_to_unknown_recipient_is_discarded() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let forum = fixture.forum("general", &alice).await;
        let token = fixture.token(&alice);

        let body = format!(r#"{{"forumId":{},"content":"hi","recipientEmail":"ghost@x.com"}}"#, forum.id);
        let outcome = fixture.pipeline().process(send(&token, &body), None).await;

        assert!(matches!(outcome, Outcome::Discarded));
        assert!(fixture.messages.is_empty());
        assert!(fixture.dispatcher.deliveries().is_empty());
    }

    #[actix_web::test]
    async fn malformed_or_misaddressed_send_is_discarded() {
        let fixture = Fixture::new();
        let alice = fixture.register("alice", "a@x.com").await;
        let token = fixture.token(&alice);
        let pipeline = fixture.pipeline();

        let garbage = pipeline.process(send(&token, "not json"), None).await;
        assert!(matches!(garbage, Outcome::Discarded));

        let elsewhere = Frame::new(Command::Send)
            .with_header("destination", "/app/other")
            .with_header(AUTHORIZATION_HEADER, bearer(&token))
            .with_body(r#"{"forumId":1,"content":"hi"}"#);
        assert!(matches!(pipeline.process(elsewhere, None).await, Outcome::Discarded));
        assert!(fixture.messages.is_empty());
    }

    #[actix_web::test]
    async fn subscriptions_need_no_token_but_private_needs_identity() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();
        let subscribe = |destination: &str| {
            Frame::new(Command::Subscribe)
                .with_header("id", "sub-0")
                .with_header("destination", destination)
                .with_header("receipt", "r-1")
        };

        let topic = pipeline.process(subscribe("/topic/forum.1"), None).await;
        assert!(matches!(topic, Outcome::Subscribed { destination: Destination::Forum(1), .. }));
        assert_eq!(topic.receipt(), Some("r-1"));

        let anonymous = pipeline.process(subscribe("/user/private"), None).await;
        assert!(matches!(anonymous, Outcome::Discarded));

        let own = pipeline.process(subscribe("/user/private"), Some("a@x.com")).await;
        assert!(matches!(own, Outcome::Subscribed { destination: Destination::Private(ref id), .. } if id == "a@x.com"));

        let foreign = pipeline.process(subscribe("/user/b@x.com/private"), Some("a@x.com")).await;
        assert!(matches!(foreign, Outcome::Discarded));
    }

    #[actix_web::test]
    async fn lifecycle_frames() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();

        let unsubscribe = Frame::new(Command::Unsubscribe).with_header("id", "sub-0");
        assert!(matches!(
            pipeline.process(unsubscribe, None).await,
            Outcome::Unsubscribed { ref subscription_id, .. } if subscription_id == "sub-0"
        ));

        let disconnect = Frame::new(Command::Disconnect).with_header("receipt", "bye");
        assert_eq!(pipeline.process(disconnect, None).await.receipt(), Some("bye"));

        let ack = Frame::new(Command::Ack).with_header("id", "m-1");
        assert!(matches!(pipeline.process(ack, None).await, Outcome::Ignored));
    }
}
