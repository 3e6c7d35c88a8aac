use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub avinode: AvinodeSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

/// Avinode marketplace credentials and addressing. Loaded once at startup;
/// missing credentials fail the process before any network call is made.
#[derive(Debug, Deserialize, Clone)]
pub struct AvinodeSettings {
    pub base_url: String,
    pub api_token: String,
    pub bearer_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_product")]
    pub product: String,
    pub act_as_account: Option<String>,
    /// Public callback URL registered with the marketplace webhook settings.
    pub webhook_url: Option<String>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_product() -> String {
    "jetvision-portal".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    900
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of JETVISION)
            // Eg.. `JETVISION__SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("JETVISION").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
