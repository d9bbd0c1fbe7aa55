// chat-server/src/lib.rs
//! Persistent chat connections for the forum service: frame codec,
//! per-frame authentication, message routing and the in-process broker.

pub mod actors;
pub mod destination;
pub mod frame;
pub mod inbound;
pub mod interceptor;
pub mod router;
pub mod routing;

#[cfg(test)]
mod testing;

pub use actors::broker_actor::{BrokerActor, BrokerDispatcher};
pub use destination::Destination;
pub use inbound::InboundPipeline;
pub use interceptor::ChannelAuthInterceptor;
pub use router::{MessageDispatcher, MessageRouter};
