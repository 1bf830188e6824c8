use std::path::{Path, PathBuf};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::domain::Settings;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory for locally stored settings and history
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// History backend: `local` or `hosted`
    #[arg(long, env = "STORAGE_BACKEND")]
    pub storage_backend: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub webhook: WebhookConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Hosted,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub hosted: HostedConfig,
}

/// Connection to the hosted history store.
#[derive(Debug, Deserialize, Clone)]
pub struct HostedConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Settings used until the user saves their own.
#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl WebhookConfig {
    #[must_use]
    pub fn default_settings(&self) -> Settings {
        Settings {
            webhook_url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            ..Settings::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering: defaults, config file, `PRISMA_*` environment, CLI flags.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("storage.backend", "local")?
            .set_default("storage.data_dir", "data")?
            .set_default("storage.hosted.url", "ws://127.0.0.1:8000")?
            .set_default("storage.hosted.namespace", "prisma")?
            .set_default("storage.hosted.database", "chat")?
            .set_default("webhook.url", "")?
            .set_default("webhook.username", "")?
            .set_default("webhook.password", "")?
            .set_default("webhook.timeout_secs", 120)?
            .set_default("ui.static_dir", "static")?
            .set_default("logging.json", false)?;

        match cli.config.as_deref() {
            Some(path) => builder = builder.add_source(File::with_name(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        // PRISMA_SERVER__PORT=8000, PRISMA_STORAGE__HOSTED__URL=ws://...
        builder = builder.add_source(
            Environment::with_prefix("PRISMA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(dir) = cli.data_dir {
            builder = builder.set_override("storage.data_dir", dir.to_string_lossy().into_owned())?;
        }
        if let Some(backend) = cli.storage_backend {
            builder = builder.set_override("storage.backend", backend.to_lowercase())?;
        }

        builder.build()?.try_deserialize()
    }
}
