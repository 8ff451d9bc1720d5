//! Application settings, read from `settings.toml` and `SITEBOOK__*`
//! environment variables (e.g. `SITEBOOK__SERVER__PORT=8080`).
//!
//! `SITEBOOK_CONFIG` overrides the settings file path.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    /// Throwaway in-memory SQLite, useful for demos.
    Memory,
    /// Path of the SQLite file, created when missing.
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path =
            std::env::var("SITEBOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("SITEBOOK").separator("__"))
            .build()?
            .try_deserialize()
    }
}
