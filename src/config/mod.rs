//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "foglio";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";
const DEFAULT_STORAGE_ROOT: &str = "storage";
const DEFAULT_POSTS_AREA: &str = "posts";
const DEFAULT_FILES_AREA: &str = "files";
const DEFAULT_BLOG_NAME: &str = "My Foglio Blog";
const DEFAULT_BLOG_OWNER: &str = "Blog Owner";
const DEFAULT_BASE_URL: &str = "http://localhost:4000/";
const DEFAULT_POSTS_PER_PAGE: u32 = 5;
const DEFAULT_COMMENTS_CLOSE_AFTER_DAYS: u32 = 7;

/// Command-line arguments for the Foglio binary.
#[derive(Debug, Parser)]
#[command(name = "foglio", version, about = "Foglio blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOGLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Foglio HTTP service.
    Serve(ServeArgs),
    /// Rebuild the summary index snapshot from the full record set.
    #[command(name = "rebuild")]
    Rebuild(RebuildArgs),
}

impl Command {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Command::Serve(args) => &args.overrides,
            Command::Rebuild(args) => &args.overrides,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RebuildArgs {
    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the listener address.
    #[arg(long = "server-bind-addr", value_name = "ADDR")]
    pub bind_addr: Option<SocketAddr>,

    /// Override the storage root directory.
    #[arg(long = "storage-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub storage_root: Option<PathBuf>,

    /// Override the public base URL used in feeds and sitemaps.
    #[arg(long = "blog-base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the admin bearer token.
    #[arg(
        long = "admin-token",
        env = "FOGLIO_ADMIN_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub admin_token: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub blog: BlogSettings,
    pub admin: AdminSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("valid default bind addr"),
        }
    }
}

/// Storage layout: one root directory holding the two logical areas, named
/// after the original's posts/files blob containers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub root: PathBuf,
    pub posts_area: String,
    pub files_area: String,
}

impl StorageSettings {
    pub fn posts_dir(&self) -> PathBuf {
        self.root.join(&self.posts_area)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(&self.files_area)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            posts_area: DEFAULT_POSTS_AREA.to_string(),
            files_area: DEFAULT_FILES_AREA.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlogSettings {
    pub name: String,
    pub owner: String,
    pub base_url: String,
    pub posts_per_page: u32,
    pub comments_close_after_days: u32,
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_BLOG_NAME.to_string(),
            owner: DEFAULT_BLOG_OWNER.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            comments_close_after_days: DEFAULT_COMMENTS_CLOSE_AFTER_DAYS,
        }
    }
}

/// Administrative access. When no token is configured the admin routes are
/// disabled entirely rather than left open.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminSettings {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

/// Parse the CLI and assemble layered settings.
pub fn load_with_cli() -> Result<(CliArgs, Settings), ConfigError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

pub fn load(cli: &CliArgs) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = &cli.config_file {
        builder = builder.add_source(File::from(path.clone()).required(true));
    }

    let raw = builder
        .add_source(Environment::with_prefix("FOGLIO").separator("__"))
        .build()?;

    let mut settings: Settings = raw.try_deserialize()?;
    if let Some(command) = &cli.command {
        apply_overrides(&mut settings, command.overrides());
    }
    validate(&settings)?;
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, overrides: &Overrides) {
    if let Some(bind_addr) = overrides.bind_addr {
        settings.server.bind_addr = bind_addr;
    }
    if let Some(storage_root) = &overrides.storage_root {
        settings.storage.root = storage_root.clone();
    }
    if let Some(base_url) = &overrides.base_url {
        settings.blog.base_url = base_url.clone();
    }
    if let Some(admin_token) = &overrides.admin_token {
        settings.admin.token = Some(admin_token.clone());
    }
    if let Some(level) = overrides.log_level {
        settings.logging.level = level;
    }
    if let Some(json) = overrides.log_json {
        settings.logging.format = if json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };
    }
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    Url::parse(&settings.blog.base_url)
        .map_err(|err| ConfigError::invalid(format!("blog.base_url is not a valid URL: {err}")))?;

    if settings.blog.posts_per_page == 0 {
        return Err(ConfigError::invalid("blog.posts_per_page must be at least 1"));
    }
    if settings.storage.posts_area == settings.storage.files_area {
        return Err(ConfigError::invalid(
            "storage.posts_area and storage.files_area must differ",
        ));
    }
    if let Some(token) = &settings.admin.token
        && token.len() < 16
    {
        return Err(ConfigError::invalid(
            "admin.token must be at least 16 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind_addr.port(), 4000);
        assert_eq!(settings.storage.posts_dir(), PathBuf::from("storage/posts"));
        assert_eq!(settings.storage.files_dir(), PathBuf::from("storage/files"));
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut settings = Settings::default();
        let overrides = Overrides {
            bind_addr: Some("0.0.0.0:8080".parse().expect("addr")),
            storage_root: Some(PathBuf::from("/var/lib/foglio")),
            base_url: Some("https://blog.example.com/".to_string()),
            admin_token: Some("0123456789abcdef".to_string()),
            log_level: Some(LogLevel::Debug),
            log_json: Some(true),
        };

        apply_overrides(&mut settings, &overrides);
        assert_eq!(settings.server.bind_addr.port(), 8080);
        assert_eq!(settings.storage.root, PathBuf::from("/var/lib/foglio"));
        assert_eq!(settings.blog.base_url, "https://blog.example.com/");
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut settings = Settings::default();
        settings.blog.base_url = "not a url".to_string();
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn short_admin_tokens_are_rejected() {
        let mut settings = Settings::default();
        settings.admin.token = Some("short".to_string());
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn colliding_storage_areas_are_rejected() {
        let mut settings = Settings::default();
        settings.storage.files_area = settings.storage.posts_area.clone();
        assert!(validate(&settings).is_err());
    }
}
