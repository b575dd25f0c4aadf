use courier_catalog::PricingConfig;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
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
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    /// No key, no geocoding.
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_seconds: u64,
}

fn default_geocoding_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
}
fn default_geocoding_timeout() -> u64 { 2000 }
fn default_failure_threshold() -> usize { 5 }
fn default_reset_timeout() -> u64 { 30 }

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_geocoding_endpoint(),
            timeout_ms: default_geocoding_timeout(),
            failure_threshold: default_failure_threshold(),
            reset_timeout_seconds: default_reset_timeout(),
        }
    }
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_seconds)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `COURIER__DATABASE__URL=postgres://...` sets `database.url`
            .add_source(config::Environment::with_prefix("COURIER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
