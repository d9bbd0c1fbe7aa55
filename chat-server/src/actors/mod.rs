// chat-server/src/actors/mod.rs

pub mod broker_actor;
pub mod connection_actor;
