// chat-server/src/routing.rs
use actix::Addr;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use forum_common::Config;

use crate::actors::broker_actor::BrokerActor;
use crate::actors::connection_actor::ConnectionActor;
use crate::inbound::InboundPipeline;

/// Sub-protocols offered during the handshake, newest first
pub const STOMP_PROTOCOLS: [&str; 3] = ["v12.stomp", "v11.stomp", "v10.stomp"];

/// Mount the persistent-connection handshake endpoint.
///
/// The handshake itself is unauthenticated; every CONNECT and SEND frame
/// on the resulting connection is authenticated on its own.
pub fn routes(cfg: &mut web::ServiceConfig, handshake_path: &str) {
    cfg.service(web::resource(handshake_path).route(web::get().to(handshake)));
}

async fn handshake(
    req: HttpRequest,
    stream: web::Payload,
    pipeline: web::Data<InboundPipeline>,
    broker: web::Data<Addr<BrokerActor>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("Handshake from {:?}", req.peer_addr());

    let connection = ConnectionActor::new(
        pipeline.into_inner(),
        broker.get_ref().clone(),
        config.heartbeat.clone(),
    );

    ws::WsResponseBuilder::new(connection, &req, stream)
        .protocols(&STOMP_PROTOCOLS)
        .start()
}
