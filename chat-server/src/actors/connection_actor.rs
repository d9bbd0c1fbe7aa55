// chat-server/src/actors/connection_actor.rs
use actix::{Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, Handler, Recipient, StreamHandler, WrapFuture};
use actix_web_actors::ws;
use forum_common::HeartbeatConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::broker_actor::{BrokerActor, Deliver, DisconnectSession, ReleasePrivate, Subscribe, Unsubscribe};
use crate::frame::{decode_batch, Command, Frame};
use crate::inbound::{InboundPipeline, Outcome};

/// What one batch of inbound frames left behind
#[derive(Debug)]
pub struct BatchResult {
    /// CONNECTED and RECEIPT frames, in the order they were produced
    pub replies: Vec<Frame>,
    pub identity: Option<String>,
    /// A DISCONNECT was seen; later frames of the batch were not processed
    pub close: bool,
}

/// The broker-facing side of one connection
#[derive(Clone)]
pub struct SessionLink {
    pub session_id: Uuid,
    pub pipeline: Arc<InboundPipeline>,
    pub broker: Addr<BrokerActor>,
    pub recipient: Recipient<Deliver>,
}

/// Runs the frames of one WebSocket message in order, issuing broker side
/// effects as it goes. `identity` is the connection's current CONNECT identity.
pub async fn process_frames(link: SessionLink, mut identity: Option<String>, frames: Vec<Frame>) -> BatchResult {
    let SessionLink {
        session_id,
        pipeline,
        broker,
        recipient,
    } = link;
    let mut replies = Vec::new();
    let mut close = false;

    for frame in frames {
        let outcome = pipeline.process(frame, identity.as_deref()).await;
        if let Some(receipt) = outcome.receipt() {
            replies.push(Frame::new(Command::Receipt).with_header("receipt-id", receipt));
        }

        match outcome {
            Outcome::Connected { principal, reply } => {
                let handle = principal.identity_handle().to_string();
                if identity.as_deref().map_or(false, |current| current != handle) {
                    tracing::info!("Connection {} re-authenticated as {}", session_id, handle);
                    broker.do_send(ReleasePrivate { session_id });
                }
                identity = Some(handle);
                replies.push(reply);
            }
            Outcome::Subscribed {
                subscription_id,
                destination,
                requested,
                ..
            } => broker.do_send(Subscribe {
                session_id,
                subscription_id,
                destination,
                requested,
                recipient: recipient.clone(),
            }),
            Outcome::Unsubscribed { subscription_id, .. } => broker.do_send(Unsubscribe {
                session_id,
                subscription_id,
            }),
            Outcome::Disconnected { .. } => {
                close = true;
                break;
            }
            Outcome::Routed { .. } | Outcome::Dropped | Outcome::Discarded | Outcome::Ignored => {}
        }
    }

    BatchResult {
        replies,
        identity,
        close,
    }
}

fn heartbeat_expired(last_heartbeat: Instant, now: Instant, timeout: Duration) -> bool {
    now.saturating_duration_since(last_heartbeat) > timeout
}

/// Actor owning one STOMP-over-WebSocket connection
pub struct ConnectionActor {
    session_id: Uuid,
    pipeline: Arc<InboundPipeline>,
    broker: Addr<BrokerActor>,
    /// Identity of the last successful CONNECT
    identity: Option<String>,
    heartbeat: HeartbeatConfig,
    last_heartbeat: Instant,
}

impl ConnectionActor {
    pub fn new(pipeline: Arc<InboundPipeline>, broker: Addr<BrokerActor>, heartbeat: HeartbeatConfig) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            pipeline,
            broker,
            identity: None,
            heartbeat,
            last_heartbeat: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let interval = Duration::from_secs(self.heartbeat.interval_secs);
        let timeout = Duration::from_secs(self.heartbeat.timeout_secs);

        ctx.run_interval(interval, move |act, ctx| {
            if heartbeat_expired(act.last_heartbeat, Instant::now(), timeout) {
                tracing::warn!("Connection heartbeat timeout: {}", act.session_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Frames of one WebSocket message are handled strictly in order, and
    /// the connection reads nothing else until the batch is done.
    fn process_batch(&mut self, frames: Vec<Frame>, ctx: &mut ws::WebsocketContext<Self>) {
        let link = SessionLink {
            session_id: self.session_id,
            pipeline: self.pipeline.clone(),
            broker: self.broker.clone(),
            recipient: ctx.address().recipient(),
        };
        let batch = process_frames(link, self.identity.clone(), frames);

        ctx.wait(batch.into_actor(self).map(|result, act, ctx| {
            act.identity = result.identity;
            for reply in result.replies {
                ctx.text(reply.encode());
            }
            if result.close {
                tracing::info!("Client {} sent DISCONNECT", act.session_id);
                ctx.close(None);
                ctx.stop();
            }
        }));
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Connection opened: {}", self.session_id);
        self.last_heartbeat = Instant::now();
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Connection closed: {}", self.session_id);
        self.broker.do_send(DisconnectSession {
            session_id: self.session_id,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                let (frames, error) = decode_batch(&text);
                // unparseable input gets no reply either
                if let Some(e) = error {
                    tracing::warn!(
                        "Discarding undecodable frame on {} after {} decoded: {}",
                        self.session_id,
                        frames.len(),
                        e
                    );
                }
                if !frames.is_empty() {
                    self.process_batch(frames, ctx);
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Discarding binary message on {}", self.session_id);
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("Client closing connection {}: {:?}", self.session_id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!("Protocol error on {}: {}", self.session_id, e);
                ctx.stop();
            }
            _ => (),
        }
    }
}

impl Handler<Deliver> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) -> Self::Result {
        let frame = Frame::new(Command::Message)
            .with_header("destination", msg.destination)
            .with_header("subscription", msg.subscription_id)
            .with_header("message-id", msg.message_id)
            .with_header("content-type", "application/json")
            .with_header("content-length", msg.body.len().to_string())
            .with_body(msg.body);
        ctx.text(frame.encode());
    }
}
