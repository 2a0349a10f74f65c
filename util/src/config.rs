//! Application configuration.
//!
//! `AppConfig` is read once at startup from `.env` and the process environment and
//! is then handed, by value or behind an `Arc`, to everything that needs it. No
//! component looks settings up on its own after construction.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Failure to build a configuration from its sources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required")]
    Missing { key: &'static str },
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Process-level configuration for the `api` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub storage_root: String,
    pub host: String,
    pub port: u16,
    pub plagiarism: PlagiarismConfig,
}

/// Settings for the similarity-service integration.
///
/// This is the only configuration the `plagiarism` crate ever sees.
#[derive(Debug, Clone)]
pub struct PlagiarismConfig {
    /// Base URL of the remote API, e.g. `https://example.invalid/api/v1`.
    pub api_url: String,
    pub api_key: String,
    pub integration_name: String,
    pub integration_version: String,
    /// Public URL the remote service should deliver webhooks to.
    pub webhook_url: String,
    /// Shared secret used until a webhook registration has been stored.
    pub webhook_secret: Option<String>,
    pub test_mode: bool,
    /// Mirror terminal failures to the remote logging endpoint.
    pub remote_logging: bool,
    /// Upper bound on submissions handled per scheduler pass.
    pub batch_size: u64,
    /// Seconds between scheduler passes.
    pub tick_seconds: u64,
    pub retry: RetrySettings,
    pub grace: GraceSettings,
    pub timeouts: TimeoutSettings,
}

/// Attempt limits and backoff intervals for both retry phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub send_max_attempts: i32,
    pub send_retry_seconds: i64,
    pub report_max_attempts: i32,
    pub report_retry_seconds: i64,
    pub report_first_retry_seconds: i64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            send_max_attempts: 6,
            send_retry_seconds: 1800,
            report_max_attempts: 10,
            report_retry_seconds: 600,
            report_first_retry_seconds: 60,
        }
    }
}

/// Delays the scheduler leaves before polling freshly uploaded or freshly
/// requested submissions, giving the webhook a chance to arrive first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceSettings {
    pub uploaded_seconds: i64,
    pub requested_seconds: i64,
    pub uploaded_test_seconds: i64,
    pub requested_test_seconds: i64,
}

impl Default for GraceSettings {
    fn default() -> Self {
        Self {
            uploaded_seconds: 120,
            requested_seconds: 300,
            uploaded_test_seconds: 10,
            requested_test_seconds: 20,
        }
    }
}

impl GraceSettings {
    pub fn uploaded(&self, test_mode: bool) -> i64 {
        if test_mode { self.uploaded_test_seconds } else { self.uploaded_seconds }
    }

    pub fn requested(&self, test_mode: bool) -> i64 {
        if test_mode { self.requested_test_seconds } else { self.requested_seconds }
    }
}

/// Request timeouts for the two call classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSettings {
    /// Webhook-adjacent checks and other calls a caller waits on.
    pub short: Duration,
    /// Bulk submission calls (creation, upload).
    pub long: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(10),
            long: Duration::from_secs(240),
        }
    }
}

impl Default for PlagiarismConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8081/api/v1".into(),
            api_key: String::new(),
            integration_name: "fitchfork-plagiarism".into(),
            integration_version: env!("CARGO_PKG_VERSION").into(),
            webhook_url: "http://127.0.0.1:3000/api/plagiarism/webhook".into(),
            webhook_secret: None,
            test_mode: false,
            remote_logging: true,
            batch_size: 50,
            tick_seconds: 60,
            retry: RetrySettings::default(),
            grace: GraceSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = required(&lookup, "DATABASE_PATH")?;

        Ok(Self {
            env: lookup("APP_ENV").unwrap_or_else(|| "development".into()),
            project_name: lookup("PROJECT_NAME").unwrap_or_else(|| "fitch-fork-plagiarism".into()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "api=info,plagiarism=info".into()),
            log_file: lookup("LOG_FILE").unwrap_or_else(|| "api.log".into()),
            log_to_stdout: parse_bool(&lookup, "LOG_TO_STDOUT", false)?,
            database_path,
            storage_root: lookup("STORAGE_ROOT").unwrap_or_else(|| "data/storage".into()),
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port: parse_or(&lookup, "PORT", 3000)?,
            plagiarism: PlagiarismConfig::from_lookup(&lookup)?,
        })
    }
}

impl PlagiarismConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PlagiarismConfig::default();
        let retry_defaults = RetrySettings::default();
        let grace_defaults = GraceSettings::default();
        let timeout_defaults = TimeoutSettings::default();

        let config = Self {
            api_url: required(lookup, "PLAGIARISM_API_URL")?,
            api_key: required(lookup, "PLAGIARISM_API_KEY")?,
            integration_name: lookup("PLAGIARISM_INTEGRATION_NAME")
                .unwrap_or(defaults.integration_name),
            integration_version: defaults.integration_version,
            webhook_url: required(lookup, "PLAGIARISM_WEBHOOK_URL")?,
            webhook_secret: lookup("PLAGIARISM_WEBHOOK_SECRET").filter(|s| !s.is_empty()),
            test_mode: parse_bool(lookup, "PLAGIARISM_TEST_MODE", defaults.test_mode)?,
            remote_logging: parse_bool(
                lookup,
                "PLAGIARISM_REMOTE_LOGGING",
                defaults.remote_logging,
            )?,
            batch_size: parse_or(lookup, "PLAGIARISM_BATCH_SIZE", defaults.batch_size)?,
            tick_seconds: parse_or(lookup, "PLAGIARISM_TICK_SECONDS", defaults.tick_seconds)?,
            retry: RetrySettings {
                send_max_attempts: parse_or(
                    lookup,
                    "PLAGIARISM_SEND_MAX_ATTEMPTS",
                    retry_defaults.send_max_attempts,
                )?,
                send_retry_seconds: parse_or(
                    lookup,
                    "PLAGIARISM_SEND_RETRY_SECONDS",
                    retry_defaults.send_retry_seconds,
                )?,
                report_max_attempts: parse_or(
                    lookup,
                    "PLAGIARISM_REPORT_MAX_ATTEMPTS",
                    retry_defaults.report_max_attempts,
                )?,
                report_retry_seconds: parse_or(
                    lookup,
                    "PLAGIARISM_REPORT_RETRY_SECONDS",
                    retry_defaults.report_retry_seconds,
                )?,
                report_first_retry_seconds: parse_or(
                    lookup,
                    "PLAGIARISM_REPORT_FIRST_RETRY_SECONDS",
                    retry_defaults.report_first_retry_seconds,
                )?,
            },
            grace: GraceSettings {
                uploaded_seconds: parse_or(
                    lookup,
                    "PLAGIARISM_UPLOADED_GRACE_SECONDS",
                    grace_defaults.uploaded_seconds,
                )?,
                requested_seconds: parse_or(
                    lookup,
                    "PLAGIARISM_REQUESTED_GRACE_SECONDS",
                    grace_defaults.requested_seconds,
                )?,
                ..grace_defaults
            },
            timeouts: TimeoutSettings {
                short: Duration::from_secs(parse_or(
                    lookup,
                    "PLAGIARISM_SHORT_TIMEOUT_SECONDS",
                    timeout_defaults.short.as_secs(),
                )?),
                long: Duration::from_secs(parse_or(
                    lookup,
                    "PLAGIARISM_LONG_TIMEOUT_SECONDS",
                    timeout_defaults.long.as_secs(),
                )?),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the cross-field rules the retry policy relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.retry;
        if r.send_max_attempts < 1 || r.report_max_attempts < 1 {
            return Err(ConfigError::Inconsistent("phase maximums must be at least 1".into()));
        }
        if r.send_retry_seconds < 1
            || r.report_retry_seconds < 1
            || r.report_first_retry_seconds < 1
        {
            return Err(ConfigError::Inconsistent(
                "retry intervals must be at least one second".into(),
            ));
        }
        // attempt 2 waits 2 * base; the fast first retry may not exceed it
        if r.report_first_retry_seconds > 2 * r.report_retry_seconds {
            return Err(ConfigError::Inconsistent(
                "first report retry must not exceed twice the report retry interval".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Inconsistent("batch size must be positive".into()));
        }
        Ok(())
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or(ConfigError::Missing { key })
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid { key, value: other.to_string() }),
    }
}
