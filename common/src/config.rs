// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the forum chat service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_addr: String,
    /// Path of the persistent-connection handshake endpoint
    pub handshake_path: String,
    pub auth: AuthConfig,
    /// Upper bound for any single store call made by the auth/routing core
    pub store_timeout_ms: u64,
    pub heartbeat: HeartbeatConfig,
    pub login_rate_limit: RateLimitConfig,
    pub log_level: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base64 encoded HMAC key, fixed for the lifetime of the process.
    /// There is no built-in value; set `APP__AUTH__JWT_SECRET` or `JWT_SECRET`.
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    /// Key clients by `Forwarded`/`X-Forwarded-For`; only behind a trusted proxy
    pub trust_forwarded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            handshake_path: "/ws".to_string(),
            auth: AuthConfig::default(),
            store_timeout_ms: 5000,
            heartbeat: HeartbeatConfig::default(),
            login_rate_limit: RateLimitConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 86400,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 60,
            trust_forwarded: false,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let mut builder = ConfigFile::builder();
        if let Ok(secret) = env::var("JWT_SECRET") {
            builder = builder.set_default("auth.jwt_secret", secret)?;
        }

        let config = builder
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. APP__AUTH__TOKEN_TTL_SECS=3600
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Self::default();

                let server_addr = env::var("SERVER_ADDR")
                    .unwrap_or(defaults.server_addr);

                let handshake_path = env::var("HANDSHAKE_PATH")
                    .unwrap_or(defaults.handshake_path);

                let jwt_secret = env::var("JWT_SECRET")
                    .unwrap_or_else(|_| {
                        tracing::warn!("JWT_SECRET is not set");
                        defaults.auth.jwt_secret
                    });

                let token_ttl_secs = env::var("TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(defaults.auth.token_ttl_secs);

                let store_timeout_ms = env::var("STORE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(defaults.store_timeout_ms);

                let log_level = env::var("LOG_LEVEL")
                    .unwrap_or(defaults.log_level);

                Self {
                    server_addr,
                    handshake_path,
                    auth: AuthConfig {
                        jwt_secret,
                        token_ttl_secs,
                    },
                    store_timeout_ms,
                    heartbeat: defaults.heartbeat,
                    login_rate_limit: defaults.login_rate_limit,
                    log_level,
                }
            }
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.handshake_path, "/ws");
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(config.auth.token_ttl_secs > 0);
        assert!(config.auth.jwt_secret.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = ConfigFile::builder()
            .add_source(config::File::from_str(
                "server_addr = \"0.0.0.0:9000\"\n[auth]\ntoken_ttl_secs = 60\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:9000");
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert!(config.auth.jwt_secret.is_empty());
        assert_eq!(config.login_rate_limit.max_requests, 5);
        assert!(!config.login_rate_limit.trust_forwarded);
    }
}
