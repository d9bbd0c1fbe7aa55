// web-server/src/main.rs
mod api;
mod middleware;
mod state;

use actix::Actor;
use actix_web::{web, App, HttpServer};
use forum_chat::{BrokerActor, BrokerDispatcher, ChannelAuthInterceptor, InboundPipeline, MessageRouter};
use forum_common::store::{InMemoryCredentialStore, InMemoryForumStore, InMemoryMessageStore};
use forum_common::{setup_tracing, AuthConfig, Config, TokenCodec};
use std::io;
use std::sync::Arc;

use middleware::{AuthenticationGate, RateLimiter};
use state::AppState;

const LOGIN_PATH: &str = "/api/auth/login";

/// Startup refuses to run without a usable signing key.
fn signing_codec(auth: &AuthConfig) -> io::Result<TokenCodec> {
    TokenCodec::from_config(auth).map_err(|e| {
        tracing::error!("Invalid token signing key: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load configuration
    let config = Config::from_env();

    setup_tracing(&config.log_level);

    // The signing key is fixed for the life of the process
    let codec = Arc::new(signing_codec(&config.auth)?);

    let credentials = Arc::new(InMemoryCredentialStore::new());
    let forums = Arc::new(InMemoryForumStore::new());
    let messages = Arc::new(InMemoryMessageStore::new());

    // Initialize the broker actor
    let broker = BrokerActor::new().start();

    let router = Arc::new(MessageRouter::new(
        credentials.clone(),
        forums.clone(),
        messages.clone(),
        Arc::new(BrokerDispatcher::new(broker.clone())),
        config.store_timeout(),
    ));
    let interceptor = ChannelAuthInterceptor::new(codec.clone(), credentials.clone(), config.store_timeout());
    let pipeline = InboundPipeline::new(interceptor, router.clone());

    let state = AppState {
        codec: codec.clone(),
        credentials: credentials.clone(),
        forums,
        messages,
        router,
        store_timeout: config.store_timeout(),
    };

    // Save address before moving config into web::Data
    let server_addr = config.server_addr.clone();
    let handshake_path = config.handshake_path.clone();
    let login_limit = config.login_rate_limit.clone();

    tracing::info!("Starting forum chat service on {}", server_addr);
    tracing::info!("Persistent connections accepted on {}", handshake_path);

    // Create data references
    let config_data = web::Data::new(config);
    let state_data = web::Data::new(state);
    let pipeline_data = web::Data::new(pipeline);
    let broker_data = web::Data::new(broker);
    let rate_limiter = RateLimiter::from_config(vec![LOGIN_PATH.to_string()], &login_limit);

    HttpServer::new(move || {
        let gate = AuthenticationGate::new(
            state_data.codec.clone(),
            state_data.credentials.clone(),
            state_data.store_timeout,
        )
        .with_default_exclusions(&handshake_path);
        let handshake_path = handshake_path.clone();

        App::new()
            .app_data(config_data.clone())
            .app_data(state_data.clone())
            .app_data(pipeline_data.clone())
            .app_data(broker_data.clone())
            .wrap(gate)
            .wrap(rate_limiter.clone())
            .configure(api::configure)
            .configure(move |cfg| forum_chat::routing::routes(cfg, &handshake_path))
    })
    .bind(&server_addr)?
    .run()
    .await
}
