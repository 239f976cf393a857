//! Handles settings for the application. Configuration is written in
//! `settings.toml` (or the file named by `RECEIPT_DESK_SETTINGS`), and every
//! key can be overridden from the environment, e.g.
//! `RECEIPT_DESK__SERVER__PORT=8080`.
//!
//! See `settings.example.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use engine::EnginePolicy;
use serde::Deserialize;

const SETTINGS_PATH_VAR: &str = "RECEIPT_DESK_SETTINGS";

fn default_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct LocalStorage {
    pub root: String,
    pub public_url: String,
}

/// Where receipt scans and avatars are uploaded.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    #[default]
    Memory,
    Local(LocalStorage),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub policy: EnginePolicy,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| "settings".to_string());
        let settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("RECEIPT_DESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
