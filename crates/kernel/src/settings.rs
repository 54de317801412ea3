use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BEDROCK_ENV";
const CONFIG_DIR_ENV: &str = "BEDROCK_CONFIG_DIR";
const ENV_PREFIX: &str = "BEDROCK";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_POOL_LIMIT: u32 = 100;

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Every rule `Settings::validate` found broken, reported together.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("config validation errors:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load `base.toml` and `<environment>.toml` from `config_dir`, overlay
    /// `BEDROCK_*` variables, then validate the result.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;
        settings.validate()?;

        Ok(settings)
    }

    /// Check every field rule and report all violations at once.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be at least 1".to_string());
        }
        if self.server.request_timeout_ms == 0 {
            errors.push("server.request_timeout_ms must be at least 1".to_string());
        }

        if self.database.uri.trim().is_empty() {
            errors.push("database.uri is required".to_string());
        } else if !is_mongodb_uri(&self.database.uri) {
            errors.push("database.uri must be a valid URI".to_string());
        }
        if self.database.database.trim().is_empty() {
            errors.push("database.database is required".to_string());
        }
        if self.database.max_pool == 0 {
            errors.push("database.max_pool must be at least 1".to_string());
        } else if self.database.max_pool > MAX_POOL_LIMIT {
            errors.push(format!("database.max_pool must be at most {MAX_POOL_LIMIT}"));
        }
        if self.database.connect_timeout_ms == 0 {
            errors.push("database.connect_timeout_ms must be at least 1".to_string());
        }

        if !LOG_LEVELS.contains(&self.telemetry.log_level.as_str()) {
            errors.push(format!(
                "telemetry.log_level must be one of: {}",
                LOG_LEVELS.join(" ")
            ));
        }

        let bootstrap = &self.bootstrap;
        for (field, value) in [
            ("bootstrap.database", &bootstrap.database),
            ("bootstrap.username", &bootstrap.username),
            ("bootstrap.password", &bootstrap.password),
            ("bootstrap.collection", &bootstrap.collection),
        ] {
            if value.is_empty() {
                errors.push(format!("{field} is required"));
            }
        }
        if bootstrap.roles.is_empty() {
            errors.push("bootstrap.roles is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(errors))
        }
    }
}

fn is_mongodb_uri(uri: &str) -> bool {
    ["mongodb://", "mongodb+srv://"]
        .iter()
        .filter_map(|scheme| uri.strip_prefix(scheme))
        .any(|rest| !rest.is_empty() && !rest.contains(char::is_whitespace))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Connection parameters for the MongoDB deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    /// Database the service reads from once bootstrapped.
    #[serde(default = "DatabaseSettings::default_database")]
    pub database: String,
    #[serde(default = "DatabaseSettings::default_max_pool")]
    pub max_pool: u32,
    #[serde(default = "DatabaseSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_database() -> String {
        "app_db".to_string()
    }

    fn default_max_pool() -> u32 {
        10
    }

    fn default_connect_timeout_ms() -> u64 {
        5000
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            database: Self::default_database(),
            max_pool: Self::default_max_pool(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// The user and collection provisioned by `bedrock-cli bootstrap`.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapSettings {
    #[serde(default = "BootstrapSettings::default_database")]
    pub database: String,
    #[serde(default = "BootstrapSettings::default_username")]
    pub username: String,
    #[serde(default = "BootstrapSettings::default_password")]
    pub password: String,
    #[serde(default = "BootstrapSettings::default_roles")]
    pub roles: Vec<RoleSettings>,
    #[serde(default = "BootstrapSettings::default_collection")]
    pub collection: String,
}

impl BootstrapSettings {
    fn default_database() -> String {
        "app_db".to_string()
    }

    fn default_username() -> String {
        "admin".to_string()
    }

    fn default_password() -> String {
        "admin".to_string()
    }

    fn default_roles() -> Vec<RoleSettings> {
        ["readWrite", "dbAdmin"]
            .into_iter()
            .map(|role| RoleSettings {
                role: role.to_string(),
                db: Self::default_database(),
            })
            .collect()
    }

    fn default_collection() -> String {
        "initial".to_string()
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            database: Self::default_database(),
            username: Self::default_username(),
            password: Self::default_password(),
            roles: Self::default_roles(),
            collection: Self::default_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoleSettings {
    pub role: String,
    pub db: String,
}
