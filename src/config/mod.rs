//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, FromArgMatches, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "revalidator";
const ENV_PREFIX: &str = "REVALIDATOR";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ENDPOINT_PORT: u16 = 3000;
const DEFAULT_RELAY_PORT: u16 = 3001;
const DEFAULT_RELAY_TIMEOUT_MS: u64 = 5_000;
pub(crate) const DEFAULT_CACHE_RESPONSE_LIMIT: usize = 200;
pub(crate) const DEFAULT_CACHE_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Command-line arguments for the revalidator binary.
#[derive(Debug, Parser)]
#[command(
    name = "revalidator",
    version,
    about = "Cache revalidation endpoint and invalidation relay"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "REVALIDATOR_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run both the revalidation endpoint host and the relay host.
    Serve(Box<ServeArgs>),
    /// Run only the revalidation endpoint host.
    Endpoint(Box<ServeArgs>),
    /// Run only the invalidation relay host.
    Relay(Box<ServeArgs>),
    /// Send a single revalidation request through the relay client.
    Revalidate(RevalidateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

impl ServeArgs {
    /// Serve arguments for a bare invocation, with env-backed flags resolved.
    pub fn from_env() -> Result<Self, clap::Error> {
        let command = Self::augment_args(clap::Command::new("serve"));
        let matches = command.try_get_matches_from(["serve"])?;
        Self::from_arg_matches(&matches)
    }
}

/// Shared-secret and upstream overrides; the bare environment names are accepted.
#[derive(Debug, Args, Default, Clone)]
pub struct RevalidateOverrides {
    /// Shared secret presented to the revalidation endpoint.
    #[arg(
        long = "revalidate-secret",
        env = "REVALIDATE_SECRET",
        hide_env_values = true,
        value_name = "SECRET"
    )]
    pub secret: Option<String>,

    /// Base URL of the host serving the revalidation endpoint.
    #[arg(long = "endpoint-url", env = "NEXTJS_URL", value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Override the outbound relay timeout in milliseconds.
    #[arg(long = "relay-timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub revalidate: RevalidateOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the revalidation endpoint port.
    #[arg(long = "server-endpoint-port", value_name = "PORT")]
    pub endpoint_port: Option<u16>,

    /// Override the relay port.
    #[arg(long = "server-relay-port", value_name = "PORT")]
    pub relay_port: Option<u16>,

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

    /// Enable the rendered page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the maximum number of cached pages.
    #[arg(long = "cache-response-limit", value_name = "COUNT")]
    pub cache_response_limit: Option<usize>,

    /// Override the largest cacheable page body in bytes.
    #[arg(long = "cache-body-limit-bytes", value_name = "BYTES")]
    pub cache_body_limit_bytes: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct RevalidateArgs {
    #[command(flatten)]
    pub overrides: RevalidateOverrides,

    /// Route path to revalidate.
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// Cache tag to revalidate.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub revalidate: RevalidateSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub endpoint_addr: SocketAddr,
    pub relay_addr: SocketAddr,
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

/// Shared-secret material and the relay's upstream.
#[derive(Clone)]
pub struct RevalidateSettings {
    pub secret: Option<String>,
    pub endpoint_url: Option<Url>,
    pub timeout: Duration,
}

impl std::fmt::Debug for RevalidateSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevalidateSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("endpoint_url", &self.endpoint_url.as_ref().map(Url::as_str))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub response_limit: NonZeroUsize,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to resolve command-line defaults: {0}")]
    Cli(#[from] clap::Error),
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args))
        | Some(Command::Endpoint(args))
        | Some(Command::Relay(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Revalidate(args)) => raw.apply_revalidate_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeArgs::from_env()?.overrides),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    revalidate: RawRevalidateSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.endpoint_port {
            self.server.endpoint_port = Some(port);
        }
        if let Some(port) = overrides.relay_port {
            self.server.relay_port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.cache_response_limit {
            self.cache.response_limit = Some(limit);
        }
        if let Some(limit) = overrides.cache_body_limit_bytes {
            self.cache.body_limit_bytes = Some(limit);
        }

        self.apply_revalidate_overrides(&overrides.revalidate);
    }

    fn apply_revalidate_overrides(&mut self, overrides: &RevalidateOverrides) {
        if let Some(secret) = overrides.secret.as_ref() {
            self.revalidate.secret = Some(secret.clone());
        }
        if let Some(url) = overrides.endpoint_url.as_ref() {
            self.revalidate.endpoint_url = Some(url.clone());
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.revalidate.timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            revalidate,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            revalidate: build_revalidate_settings(revalidate)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let endpoint_port = server.endpoint_port.unwrap_or(DEFAULT_ENDPOINT_PORT);
    if endpoint_port == 0 {
        return Err(LoadError::invalid(
            "server.endpoint_port",
            "port must be greater than zero",
        ));
    }

    let relay_port = server.relay_port.unwrap_or(DEFAULT_RELAY_PORT);
    if relay_port == 0 {
        return Err(LoadError::invalid(
            "server.relay_port",
            "port must be greater than zero",
        ));
    }

    let endpoint_addr = parse_socket_addr(&host, endpoint_port)
        .map_err(|reason| LoadError::invalid("server.endpoint_addr", reason))?;
    let relay_addr = parse_socket_addr(&host, relay_port)
        .map_err(|reason| LoadError::invalid("server.relay_addr", reason))?;

    Ok(ServerSettings {
        endpoint_addr,
        relay_addr,
    })
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

fn build_revalidate_settings(
    revalidate: RawRevalidateSettings,
) -> Result<RevalidateSettings, LoadError> {
    // Blank secrets count as unset.
    let secret = revalidate
        .secret
        .filter(|value| !value.trim().is_empty());

    let endpoint_url = match non_blank(revalidate.endpoint_url) {
        Some(raw) => {
            let url = Url::parse(&raw).map_err(|err| {
                LoadError::invalid("revalidate.endpoint_url", format!("invalid url: {err}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "revalidate.endpoint_url",
                    format!("unsupported scheme `{}`", url.scheme()),
                ));
            }
            Some(url)
        }
        None => None,
    };

    let timeout_ms = revalidate.timeout_ms.unwrap_or(DEFAULT_RELAY_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "revalidate.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(RevalidateSettings {
        secret,
        endpoint_url,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let response_limit = cache
        .response_limit
        .unwrap_or(DEFAULT_CACHE_RESPONSE_LIMIT);
    let response_limit = NonZeroUsize::new(response_limit)
        .ok_or_else(|| LoadError::invalid("cache.response_limit", "must be greater than zero"))?;

    let body_limit_bytes = cache
        .body_limit_bytes
        .unwrap_or(DEFAULT_CACHE_BODY_LIMIT_BYTES);
    if body_limit_bytes == 0 {
        return Err(LoadError::invalid(
            "cache.body_limit_bytes",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        response_limit,
        body_limit_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    endpoint_port: Option<u16>,
    relay_port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
    endpoint_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    response_limit: Option<usize>,
    body_limit_bytes: Option<usize>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
