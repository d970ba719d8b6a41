//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_MAX_PAGE_SIZE: usize = 100;
const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 1000;
const DEFAULT_SEED_POSTS: usize = 1000;

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "In-memory post store workbench")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive concurrent readers and writers against a loaded store.
    Bench(Box<BenchArgs>),
    /// Load the store and print one query result as JSON.
    Inspect(Box<InspectArgs>),
}

#[derive(Debug, Args, Clone)]
pub struct BenchArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Number of concurrent reader tasks.
    #[arg(long, default_value_t = 8)]
    pub readers: usize,

    /// Number of concurrent writer tasks.
    #[arg(long, default_value_t = 2)]
    pub writers: usize,

    /// How long to run the workload.
    #[arg(long = "duration-seconds", default_value_t = 5, value_name = "SECONDS")]
    pub duration_seconds: u64,
}

impl Default for BenchArgs {
    fn default() -> Self {
        Self {
            overrides: RuntimeOverrides::default(),
            readers: 8,
            writers: 2,
            duration_seconds: 5,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Page size; defaults to `store.default_page_size`.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<usize>,

    /// Search keyword (title or body substring).
    #[arg(long, value_name = "TEXT")]
    pub keyword: Option<String>,

    /// Administrative status filter (draft|published|archived).
    #[arg(long, value_name = "STATUS")]
    pub status: Option<String>,

    /// Print the year-month archive grouping instead of a page.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub archives: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the mutation queue capacity.
    #[arg(long = "queue-capacity", value_name = "COUNT")]
    pub queue_capacity: Option<usize>,

    /// Override the number of generated posts when no archive is configured.
    #[arg(long = "seed-posts", value_name = "COUNT")]
    pub seed_posts: Option<usize>,

    /// Load the initial posts from a TOML archive.
    #[arg(long = "archive", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub archive: Option<PathBuf>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub loader: LoaderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub queue_capacity: NonZeroUsize,
    pub default_page_size: NonZeroUsize,
    pub max_page_size: NonZeroUsize,
    pub submit_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub archive: Option<PathBuf>,
    pub seed_posts: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Bench(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Inspect(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&RuntimeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process CLI arguments, returning both.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    loader: RawLoaderSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    queue_capacity: Option<usize>,
    default_page_size: Option<usize>,
    max_page_size: Option<usize>,
    submit_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoaderSettings {
    archive: Option<PathBuf>,
    seed_posts: Option<usize>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.store.queue_capacity = Some(capacity);
        }
        if let Some(count) = overrides.seed_posts {
            self.loader.seed_posts = Some(count);
        }
        if let Some(path) = overrides.archive.as_ref() {
            self.loader.archive = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            store,
            loader,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            loader: build_loader_settings(loader)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let queue_capacity = non_zero_usize(
        store.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
        "store.queue_capacity",
    )?;
    let default_page_size = non_zero_usize(
        store.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        "store.default_page_size",
    )?;
    let max_page_size = non_zero_usize(
        store.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        "store.max_page_size",
    )?;
    if max_page_size < default_page_size {
        return Err(LoadError::invalid(
            "store.max_page_size",
            format!("must be at least default_page_size ({default_page_size})"),
        ));
    }

    let timeout_ms = store
        .submit_timeout_ms
        .unwrap_or(DEFAULT_SUBMIT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "store.submit_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(StoreSettings {
        queue_capacity,
        default_page_size,
        max_page_size,
        submit_timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_loader_settings(loader: RawLoaderSettings) -> Result<LoaderSettings, LoadError> {
    let archive = loader.archive.filter(|path| !path.as_os_str().is_empty());
    if let Some(path) = archive.as_ref()
        && path.is_dir()
    {
        return Err(LoadError::invalid(
            "loader.archive",
            format!("`{}` is a directory", path.display()),
        ));
    }

    Ok(LoaderSettings {
        archive,
        seed_posts: loader.seed_posts.unwrap_or(DEFAULT_SEED_POSTS),
    })
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
