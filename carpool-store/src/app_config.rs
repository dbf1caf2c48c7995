use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PagingConfig {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self { default_size: 10, max_size: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests: 100, window_seconds: 60 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }
}

/// Eg. `CARPOOL__SERVER__PORT=9000`. The separator also follows the prefix.
fn environment() -> config::Environment {
    config::Environment::with_prefix("CARPOOL").separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        port = 8080

        [store]
        backend = "memory"

        [database]
        url = "postgres://localhost/carpool"

        [auth]
        jwt_secret = "secret"
        jwt_expiration_seconds = 3600
    "#;

    #[test]
    fn test_deserialize_minimal_config() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(MINIMAL, config::FileFormat::Toml))
            .build()
            .unwrap();

        let cfg: Config = s.try_deserialize().unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.database.max_connections, 5);
        assert!(cfg.redis.is_none());
        assert_eq!(cfg.paging.max_size, 100);
        assert_eq!(cfg.rate_limit.requests, 100);
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        let vars: config::Map<String, String> = [
            ("CARPOOL__SERVER__PORT", "9000"),
            ("CARPOOL__STORE__BACKEND", "postgres"),
            // Single underscore after the prefix is not picked up.
            ("CARPOOL_AUTH__JWT_SECRET", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(MINIMAL, config::FileFormat::Toml))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.store.backend, StoreBackend::Postgres);
        assert_eq!(cfg.auth.jwt_secret, "secret");
    }
}
