// web-server/src/middleware/auth_gate.rs
//! Request-scoped bearer authentication.
//!
//! The gate only ever attaches a [`Principal`] to the request extensions; it
//! never rejects. Handlers that need a caller take an
//! [`AuthenticatedPrincipal`], which answers 401 when nothing was attached.

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use forum_common::models::Principal;
use forum_common::store::{resolve_principal, CredentialStore};
use forum_common::{bearer_token, ServiceError, TokenCodec};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Path prefix the gate skips, optionally for one method only
#[derive(Debug, Clone)]
pub struct PathRule {
    prefix: String,
    method: Option<Method>,
}

impl PathRule {
    pub fn any(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            method: None,
        }
    }

    pub fn method(method: Method, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            method: Some(method),
        }
    }

    /// `/api/auth` covers `/api/auth` and everything below it, not `/api/authx`
    fn matches(&self, method: &Method, path: &str) -> bool {
        if self.method.as_ref().map_or(false, |m| m != method) {
            return false;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct AuthenticationGate {
    codec: Arc<TokenCodec>,
    credentials: Arc<dyn CredentialStore>,
    lookup_timeout: Duration,
    exclusions: Arc<Vec<PathRule>>,
}

impl AuthenticationGate {
    pub fn new(codec: Arc<TokenCodec>, credentials: Arc<dyn CredentialStore>, lookup_timeout: Duration) -> Self {
        Self {
            codec,
            credentials,
            lookup_timeout,
            exclusions: Arc::new(Vec::new()),
        }
    }

    pub fn exclude(mut self, rule: PathRule) -> Self {
        Arc::make_mut(&mut self.exclusions).push(rule);
        self
    }

    /// Login/register, the handshake endpoint and read-only forum browsing
    pub fn with_default_exclusions(self, handshake_path: &str) -> Self {
        self.exclude(PathRule::any("/api/auth"))
            .exclude(PathRule::any(handshake_path))
            .exclude(PathRule::method(Method::GET, "/api/forums"))
    }

    fn is_excluded(&self, method: &Method, path: &str) -> bool {
        self.exclusions.iter().any(|rule| rule.matches(method, path))
    }

    async fn authenticate(&self, authorization: Option<String>) -> Option<Principal> {
        let authorization = authorization?;
        let Some(token) = bearer_token(&authorization) else {
            tracing::debug!("Authorization header is not a bearer token");
            return None;
        };

        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("Rejected bearer token: {}", e);
                return None;
            }
        };

        match resolve_principal(self.credentials.as_ref(), &claims.subject, self.lookup_timeout).await {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::warn!("Principal lookup for {} failed: {}", claims.subject, e);
                None
            }
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationGateMiddleware {
            service: Rc::new(service),
            gate: self.clone(),
        }))
    }
}

pub struct AuthenticationGateMiddleware<S> {
    service: Rc<S>,
    gate: AuthenticationGate,
}

impl<S, B> Service<ServiceRequest> for AuthenticationGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let gate = self.gate.clone();

        Box::pin(async move {
            if !gate.is_excluded(req.method(), req.path()) {
                let authorization = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);

                if let Some(principal) = gate.authenticate(authorization).await {
                    tracing::debug!("{} {} authenticated as {}", req.method(), req.path(), principal.identity_handle());
                    req.extensions_mut().insert(principal);
                }
            }

            service.call(req).await
        })
    }
}

/// The principal attached by [`AuthenticationGate`]; 401 when absent.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

impl FromRequest for AuthenticatedPrincipal {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .map(AuthenticatedPrincipal)
                .ok_or(ServiceError::Unauthenticated),
        )
    }
}
