//! # configs
//!
//! Layered settings: built-in defaults, then `config/default.toml`, then
//! `config/{NADBENCH_ENV}.toml`, then `NADBENCH_*` environment variables
//! (`__` separates sections, e.g. `NADBENCH_SERVER__PORT=8080`).

use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Postgres URL. Unset means the in-memory document store.
    #[serde(default, deserialize_with = "optional_secret")]
    pub url: Option<SecretString>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default = "empty_secret", deserialize_with = "secret")]
    pub secret_access_key: SecretString,
    /// S3-compatible endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Base URL for uploaded objects; defaults to the bucket's AWS URL
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default = "default_local_root")]
    pub local_root: String,
    #[serde(default = "default_local_url_prefix")]
    pub local_url_prefix: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: String::new(),
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: empty_secret(),
            endpoint: None,
            public_base_url: None,
            local_root: default_local_root(),
            local_url_prefix: default_local_url_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// HMAC key for session cookies. Required.
    #[serde(default = "empty_secret", deserialize_with = "secret")]
    pub secret: SecretString,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Adds `Secure` to the session cookie
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: empty_secret(),
            cookie_name: default_cookie_name(),
            ttl_seconds: default_ttl_seconds(),
            secure: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 5 }
fn default_region() -> String { "us-east-2".into() }
fn default_local_root() -> String { "./data/media".into() }
fn default_local_url_prefix() -> String { "/media".into() }
fn default_max_upload_bytes() -> usize { 5 * 1024 * 1024 }
fn default_cookie_name() -> String { "nadbench_session".into() }
fn default_ttl_seconds() -> u64 { 8 * 60 * 60 }
fn default_page_size() -> usize { 20 }
fn default_log_level() -> String { "info,tower_http=info".into() }

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn secret<'de, D: Deserializer<'de>>(d: D) -> Result<SecretString, D::Error> {
    String::deserialize(d).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(SecretString::from))
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::finish(layered()?)
    }

    /// Loads the same layers as [`Settings::load`] but only the database
    /// section, which is all offline tools like `seed` need. The web-only
    /// checks (session secret, storage) are skipped.
    pub fn load_database() -> Result<DatabaseSettings, ConfigError> {
        Self::database_section(layered()?)
    }

    /// Parses settings from TOML text, still honouring the environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(env_source())
            .build()?;
        Self::finish(cfg)
    }

    fn database_section(cfg: Config) -> Result<DatabaseSettings, ConfigError> {
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings.database)
    }

    fn finish(cfg: Config) -> Result<Self, ConfigError> {
        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "session.secret",
                message: "must be set (NADBENCH_SESSION__SECRET)".into(),
            });
        }
        if self.session.ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "session.ttl_seconds",
                message: "must be greater than zero".into(),
            });
        }
        if self.admin.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "admin.page_size",
                message: "must be greater than zero".into(),
            });
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.bucket",
                message: "required when storage.backend = \"s3\"".into(),
            });
        }
        Ok(())
    }
}

fn layered() -> Result<Config, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    let env_name = std::env::var("NADBENCH_ENV").unwrap_or_else(|_| "development".into());

    Ok(Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{env_name}")).required(false))
        .add_source(env_source())
        .build()?)
}

fn env_source() -> Environment {
    Environment::with_prefix("NADBENCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
