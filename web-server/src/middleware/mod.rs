// web-server/src/middleware/mod.rs
pub mod auth_gate;
pub mod rate_limiter;

pub use auth_gate::{AuthenticatedPrincipal, AuthenticationGate};
pub use rate_limiter::RateLimiter;
