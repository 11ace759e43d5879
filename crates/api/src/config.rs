use std::path::PathBuf;

use pdfrelay_events::RedisConfig;
use pdfrelay_worker::engine::{EngineConfig, DEFAULT_ENGINE_ARGS, DEFAULT_ENGINE_BIN};

/// Extra time the HTTP layer allows beyond the job deadline, so the job
/// deadline always fires first and the terminal event still goes out.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration loaded from environment variables.
///
/// Broker settings, the channel name, the bind port and the debug flag are
/// required; a missing one is a fatal startup error. Everything else has a
/// default suitable for a single-host deployment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (`WEBSERVICE_PORT`, required).
    pub port: u16,
    /// Verbose logging (`DEBUG_MODE`, required).
    pub debug: bool,
    /// Allowed CORS origins; `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes.
    pub max_upload_bytes: usize,
    /// Maximum wall-clock time of one conversion.
    pub job_timeout_secs: u64,
    /// Directory under which per-request scratch directories are created.
    pub scratch_root: PathBuf,
    /// Scratch directories older than this are reaped.
    pub scratch_max_age_secs: u64,
    /// How often the scratch reaper runs.
    pub scratch_reap_interval_secs: u64,
    /// Conversion engine executable and leading arguments.
    pub engine: EngineConfig,
    /// Pub/sub broker connection.
    pub redis: RedisConfig,
    /// Pub/sub channel progress events are published on.
    pub redis_channel: String,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `REDIS_HOST`                 | required                |
    /// | `REDIS_PORT`                 | required                |
    /// | `REDIS_PASSWORD`             | required (may be empty) |
    /// | `REDIS_CHANNEL`              | required                |
    /// | `WEBSERVICE_PORT`            | required                |
    /// | `DEBUG_MODE`                 | required                |
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `CORS_ORIGINS`               | `*`                     |
    /// | `MAX_CONTENT_LENGTH`         | `50000000`              |
    /// | `JOB_TIMEOUT_SECS`           | `3600`                  |
    /// | `SCRATCH_ROOT`               | `$TMPDIR/pdfrelay`      |
    /// | `SCRATCH_MAX_AGE_SECS`       | `7200`                  |
    /// | `SCRATCH_REAP_INTERVAL_SECS` | `300`                   |
    /// | `OCR_ENGINE_BIN`             | `ocrmypdf`              |
    /// | `OCR_ENGINE_ARGS`            | `-v 1`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let redis = RedisConfig {
            host: required("REDIS_HOST")?,
            port: parse("REDIS_PORT", &required("REDIS_PORT")?)?,
            password: required("REDIS_PASSWORD")?,
        };
        let redis_channel = required("REDIS_CHANNEL")?;
        if redis_channel.is_empty() {
            return Err(ConfigError::Invalid {
                name: "REDIS_CHANNEL",
                reason: "must not be empty".into(),
            });
        }

        let port = parse("WEBSERVICE_PORT", &required("WEBSERVICE_PORT")?)?;
        let debug = matches!(required("DEBUG_MODE")?.as_str(), "True" | "true" | "1");

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_bytes: usize = optional(&lookup, "MAX_CONTENT_LENGTH", "50000000")?;
        let job_timeout_secs: u64 = optional(&lookup, "JOB_TIMEOUT_SECS", "3600")?;
        let scratch_max_age_secs: u64 = optional(&lookup, "SCRATCH_MAX_AGE_SECS", "7200")?;
        let scratch_reap_interval_secs: u64 =
            optional(&lookup, "SCRATCH_REAP_INTERVAL_SECS", "300")?;

        if scratch_max_age_secs <= job_timeout_secs {
            return Err(ConfigError::Invalid {
                name: "SCRATCH_MAX_AGE_SECS",
                reason: format!("must exceed JOB_TIMEOUT_SECS ({job_timeout_secs})"),
            });
        }
        if scratch_reap_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SCRATCH_REAP_INTERVAL_SECS",
                reason: "must be positive".into(),
            });
        }

        let scratch_root = lookup("SCRATCH_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("pdfrelay"));

        let engine = EngineConfig::new(
            lookup("OCR_ENGINE_BIN").unwrap_or_else(|| DEFAULT_ENGINE_BIN.into()),
            match lookup("OCR_ENGINE_ARGS") {
                Some(args) => args.split_whitespace().map(str::to_string).collect(),
                None => DEFAULT_ENGINE_ARGS.iter().map(|s| s.to_string()).collect(),
            },
        );

        Ok(Self {
            host,
            port,
            debug,
            cors_origins,
            max_upload_bytes,
            job_timeout_secs,
            scratch_root,
            scratch_max_age_secs,
            scratch_reap_interval_secs,
            engine,
            redis,
            redis_channel,
        })
    }

    /// HTTP request timeout: the job deadline plus a margin.
    pub fn request_timeout_secs(&self) -> u64 {
        self.job_timeout_secs + REQUEST_TIMEOUT_MARGIN_SECS
    }
}

fn optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse(name, &lookup(name).unwrap_or_else(|| default.to_string()))
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: format!("{value:?}: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
