// chat-server/src/actors/broker_actor.rs
use actix::{Actor, Addr, Context, Handler, Message, Recipient};
use forum_common::models::ChatMessage;
use std::collections::HashMap;
use uuid::Uuid;

use crate::destination::Destination;
use crate::router::MessageDispatcher;

/// One MESSAGE frame worth of data for a connection
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Deliver {
    pub subscription_id: String,
    pub destination: String,
    pub message_id: String,
    pub body: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub session_id: Uuid,
    pub subscription_id: String,
    pub destination: Destination,
    /// Echoed back as the destination header of deliveries
    pub requested: String,
    pub recipient: Recipient<Deliver>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub session_id: Uuid,
    pub subscription_id: String,
}

/// Drops the private subscriptions of a session whose identity changed
#[derive(Message)]
#[rtype(result = "()")]
pub struct ReleasePrivate {
    pub session_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct DisconnectSession {
    pub session_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish {
    pub destination: Destination,
    pub message: ChatMessage,
}

#[derive(Message)]
#[rtype(result = "usize")]
pub struct SubscriberCount {
    pub destination: Destination,
}

struct Subscriber {
    session_id: Uuid,
    subscription_id: String,
    requested: String,
    recipient: Recipient<Deliver>,
}

/// In-process message broker keyed by destination
#[derive(Default)]
pub struct BrokerActor {
    subscriptions: HashMap<Destination, Vec<Subscriber>>,
    delivered: u64,
}

impl BrokerActor {
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_where(&mut self, mut doomed: impl FnMut(&Destination, &Subscriber) -> bool) {
        for (destination, subscribers) in self.subscriptions.iter_mut() {
            subscribers.retain(|s| !doomed(destination, s));
        }
        self.subscriptions.retain(|_, subscribers| !subscribers.is_empty());
    }
}

impl Actor for BrokerActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Message broker started");
    }
}

impl Handler<Subscribe> for BrokerActor {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Self::Context) -> Self::Result {
        tracing::debug!("Session {} subscribed to {} as {}", msg.session_id, msg.destination, msg.subscription_id);

        // a re-used subscription id replaces the old subscription
        let (session_id, subscription_id) = (msg.session_id, msg.subscription_id.clone());
        self.remove_where(|_, s| s.session_id == session_id && s.subscription_id == subscription_id);

        self.subscriptions.entry(msg.destination).or_default().push(Subscriber {
            session_id: msg.session_id,
            subscription_id: msg.subscription_id,
            requested: msg.requested,
            recipient: msg.recipient,
        });
    }
}

impl Handler<Unsubscribe> for BrokerActor {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _ctx: &mut Self::Context) -> Self::Result {
        tracing::debug!("Session {} unsubscribed {}", msg.session_id, msg.subscription_id);
        self.remove_where(|_, s| s.session_id == msg.session_id && s.subscription_id == msg.subscription_id);
    }
}

impl Handler<ReleasePrivate> for BrokerActor {
    type Result = ();

    fn handle(&mut self, msg: ReleasePrivate, _ctx: &mut Self::Context) -> Self::Result {
        self.remove_where(|destination, s| !destination.is_broadcast() && s.session_id == msg.session_id);
    }
}

impl Handler<DisconnectSession> for BrokerActor {
    type Result = ();

    fn handle(&mut self, msg: DisconnectSession, _ctx: &mut Self::Context) -> Self::Result {
        tracing::debug!("Releasing subscriptions of session {}", msg.session_id);
        self.remove_where(|_, s| s.session_id == msg.session_id);
    }
}

impl Handler<Publish> for BrokerActor {
    type Result = ();

    fn handle(&mut self, msg: Publish, _ctx: &mut Self::Context) -> Self::Result {
        let Some(subscribers) = self.subscriptions.get(&msg.destination) else {
            tracing::debug!("No subscribers for {}", msg.destination);
            return;
        };

        let body = match serde_json::to_string(&msg.message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize message {}: {}", msg.message.id(), e);
                return;
            }
        };

        tracing::info!("Delivering message {} to {} subscriber(s) of {}", msg.message.id(), subscribers.len(), msg.destination);
        for subscriber in subscribers {
            self.delivered += 1;
            subscriber.recipient.do_send(Deliver {
                subscription_id: subscriber.subscription_id.clone(),
                destination: subscriber.requested.clone(),
                message_id: format!("{}-{}", msg.message.id(), self.delivered),
                body: body.clone(),
            });
        }
    }
}

impl Handler<SubscriberCount> for BrokerActor {
    type Result = usize;

    fn handle(&mut self, msg: SubscriberCount, _ctx: &mut Self::Context) -> Self::Result {
        self.subscriptions.get(&msg.destination).map_or(0, Vec::len)
    }
}

/// Routes dispatches from the message router into the broker mailbox
#[derive(Clone)]
pub struct BrokerDispatcher {
    broker: Addr<BrokerActor>,
}

impl BrokerDispatcher {
    pub fn new(broker: Addr<BrokerActor>) -> Self {
        Self { broker }
    }
}

impl MessageDispatcher for BrokerDispatcher {
    fn dispatch(&self, destination: &Destination, message: &ChatMessage) {
        self.broker.do_send(Publish {
            destination: destination.clone(),
            message: message.clone(),
        });
    }
}
