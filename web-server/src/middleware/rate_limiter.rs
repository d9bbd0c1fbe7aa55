// web-server/src/middleware/rate_limiter.rs
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse, ResponseError,
};
use forum_common::RateLimitConfig;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: Duration,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, retry_after_secs(self.retry_after).to_string()))
            .json(json!({
                "error": "Too many login attempts. Please try again later."
            }))
    }
}

// whole seconds, rounded up, never zero
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Sliding-window limiter keyed by client IP, applied to selected paths
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    trust_forwarded: bool,
    store: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            paths,
            max_requests,
            window,
            trust_forwarded: false,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(paths: Vec<String>, config: &RateLimitConfig) -> Self {
        Self::new(paths, config.max_requests, Duration::from_secs(config.window_secs))
            .trust_forwarded(config.trust_forwarded)
    }

    /// Key on the forwarded client address instead of the socket peer.
    pub fn trust_forwarded(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded {
            if let Some(ip) = req.connection_info().realip_remote_addr() {
                return ip.to_string();
            }
        }
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Records the attempt unless the client is over the limit; returns the
    /// wait until the oldest attempt leaves the window when it is.
    fn check(&self, ip: &str, now: Instant) -> Option<Duration> {
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = self.window;
        store.retain(|_, attempts| {
            attempts.retain(|at| now.saturating_duration_since(*at) < window);
            !attempts.is_empty()
        });

        let attempts = store.entry(ip.to_string()).or_default();

        if attempts.len() >= self.max_requests {
            let oldest = attempts.first().copied().unwrap_or(now);
            return Some(window.saturating_sub(now.duration_since(oldest)));
        }

        attempts.push(now);
        None
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        match self.store.lock() {
            Ok(store) => store.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
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
        if self.limiter.applies_to(req.path()) {
            let ip = self.limiter.client_key(&req);

            if let Some(retry_after) = self.limiter.check(&ip, Instant::now()) {
                tracing::warn!("Login rate limit exceeded for IP: {}", ip);
                return Box::pin(async move { Err(RateLimitExceeded { retry_after }.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}
