//! Configuration loader
//!
//! Loads scheduler configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `DELAYQ_QUEUE_URL` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `DELAYQ_QUEUE_URL`: Queue URL (required)
//! - `DELAYQ_QUEUE_REGION`: Queue region
//! - `DELAYQ_QUEUE_ENDPOINT`: Endpoint override (local emulators)
//! - `DELAYQ_MAX_ATTEMPTS`: Attempt budget, `0` for unlimited
//! - `DELAYQ_BACKOFF`: `constant`, `linear` or `exponential`
//! - `DELAYQ_BACKOFF_SEED_SECS`: Backoff seed in seconds
//! - `DELAYQ_RECEIVE_WAIT_SECS`: Long-poll wait in seconds
//! - `DELAYQ_DUE_TOLERANCE_SECS`: Slack under which a job counts as due
//! - `DELAYQ_MAX_QUEUE_DELAY_SECS`: Per-send delay ceiling in seconds
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./delayq.json` or `./delayq.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use delayq_domain::{
    BackoffConfig, BackoffKind, Config, DelayqError, QueueConfig, Result, RetryConfig,
};

use crate::errors::InfraError;

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the queue URL is
/// not set there, falls back to loading from a config file.
///
/// # Errors
/// Returns `DelayqError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded values fail validation
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `DELAYQ_QUEUE_URL` is required; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns `DelayqError::Config` if the queue URL is missing, a variable has
/// an invalid value, or the result fails validation.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();

    let url = env_var("DELAYQ_QUEUE_URL")?;
    let region = std::env::var("DELAYQ_QUEUE_REGION").ok();
    let endpoint = std::env::var("DELAYQ_QUEUE_ENDPOINT").ok();
    let receive_wait_secs =
        env_parse("DELAYQ_RECEIVE_WAIT_SECS", defaults.queue.receive_wait_secs)?;
    let max_delay_secs = env_parse("DELAYQ_MAX_QUEUE_DELAY_SECS", defaults.queue.max_delay_secs)?;

    let max_attempts = env_parse("DELAYQ_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
    let kind = env_parse::<BackoffKind>("DELAYQ_BACKOFF", defaults.retry.backoff.kind)?;
    let seed_secs = env_parse("DELAYQ_BACKOFF_SEED_SECS", defaults.retry.backoff.seed_secs)?;
    let due_tolerance_secs =
        env_parse("DELAYQ_DUE_TOLERANCE_SECS", defaults.retry.due_tolerance_secs)?;

    let config = Config {
        queue: QueueConfig { url, region, endpoint, receive_wait_secs, max_delay_secs },
        retry: RetryConfig {
            max_attempts,
            backoff: BackoffConfig { kind, seed_secs },
            due_tolerance_secs,
        },
        scheduler: defaults.scheduler,
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `DelayqError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded values fail validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DelayqError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DelayqError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(InfraError::from)?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Sections and
/// fields left out take their defaults.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(DelayqError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory first, then the directory of the
/// running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const FILE_NAMES: [&str; 4] = ["delayq.json", "delayq.toml", "config.json", "config.toml"];

    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `DelayqError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| DelayqError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable, falling back to `default`
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| DelayqError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 9] = [
        "DELAYQ_QUEUE_URL",
        "DELAYQ_QUEUE_REGION",
        "DELAYQ_QUEUE_ENDPOINT",
        "DELAYQ_MAX_ATTEMPTS",
        "DELAYQ_BACKOFF",
        "DELAYQ_BACKOFF_SEED_SECS",
        "DELAYQ_RECEIVE_WAIT_SECS",
        "DELAYQ_DUE_TOLERANCE_SECS",
        "DELAYQ_MAX_QUEUE_DELAY_SECS",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("DELAYQ_QUEUE_URL", "https://sqs.eu-west-1.amazonaws.com/1/jobs");
        std::env::set_var("DELAYQ_QUEUE_REGION", "eu-west-1");
        std::env::set_var("DELAYQ_QUEUE_ENDPOINT", "http://localhost:4566");
        std::env::set_var("DELAYQ_MAX_ATTEMPTS", "5");
        std::env::set_var("DELAYQ_BACKOFF", "Linear");
        std::env::set_var("DELAYQ_BACKOFF_SEED_SECS", "30");
        std::env::set_var("DELAYQ_RECEIVE_WAIT_SECS", "20");
        std::env::set_var("DELAYQ_DUE_TOLERANCE_SECS", "1");
        std::env::set_var("DELAYQ_MAX_QUEUE_DELAY_SECS", "600");

        let result = load_from_env();
        clear_env();
        let config = result.expect("config should load from env");

        assert_eq!(config.queue.url, "https://sqs.eu-west-1.amazonaws.com/1/jobs");
        assert_eq!(config.queue.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.queue.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.queue.receive_wait_secs, 20);
        assert_eq!(config.queue.max_delay_secs, 600);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff.kind, BackoffKind::Linear);
        assert_eq!(config.retry.backoff.seed_secs, 30);
        assert_eq!(config.retry.due_tolerance_secs, 1);
    }

    #[test]
    fn test_load_from_env_uses_defaults_for_optional_vars() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("DELAYQ_QUEUE_URL", "memory://local");

        let result = load_from_env();
        clear_env();
        let config = result.expect("config should load from env");

        assert_eq!(config.queue.url, "memory://local");
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.queue.region.is_none());
    }

    #[test]
    fn test_load_from_env_missing_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, DelayqError::Config(ref msg) if msg.contains("DELAYQ_QUEUE_URL")));
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("DELAYQ_QUEUE_URL", "memory://local");

        std::env::set_var("DELAYQ_MAX_ATTEMPTS", "-1");
        assert!(matches!(load_from_env(), Err(DelayqError::Config(_))));
        std::env::remove_var("DELAYQ_MAX_ATTEMPTS");

        std::env::set_var("DELAYQ_BACKOFF", "fibonacci");
        assert!(matches!(load_from_env(), Err(DelayqError::Config(_))));
        std::env::remove_var("DELAYQ_BACKOFF");

        std::env::set_var("DELAYQ_RECEIVE_WAIT_SECS", "0");
        assert!(matches!(load_from_env(), Err(DelayqError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "queue": { "url": "memory://json", "receive_wait_secs": 5 },
            "retry": {
                "max_attempts": 4,
                "backoff": { "kind": "constant", "seed_secs": 12 }
            }
        }"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").expect("temp file");
        temp_file.write_all(json_content.as_bytes()).expect("write config");

        let config = load_from_file(Some(temp_file.path().to_path_buf())).expect("valid json");
        assert_eq!(config.queue.url, "memory://json");
        assert_eq!(config.queue.receive_wait_secs, 5);
        assert_eq!(config.queue.max_delay_secs, 900);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.backoff.kind, BackoffKind::Constant);
        assert_eq!(config.retry.backoff.seed_secs, 12);
    }

    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
            [queue]
            url = "memory://toml"
            max_delay_secs = 300

            [retry]
            due_tolerance_secs = 3

            [retry.backoff]
            kind = "exponential"
            seed_secs = 2

            [scheduler]
            stop_timeout_secs = 30
        "#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").expect("temp file");
        temp_file.write_all(toml_content.as_bytes()).expect("write config");

        let config = load_from_file(Some(temp_file.path().to_path_buf())).expect("valid toml");
        assert_eq!(config.queue.url, "memory://toml");
        assert_eq!(config.queue.max_delay_secs, 300);
        assert_eq!(config.retry.due_tolerance_secs, 3);
        assert_eq!(config.retry.backoff.seed_secs, 2);
        assert_eq!(config.scheduler.stop_timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut temp_file = NamedTempFile::with_suffix(".json").expect("temp file");
        temp_file
            .write_all(br#"{ "retry": { "due_tolerance_secs": 900 } }"#)
            .expect("write config");

        let err = load_from_file(Some(temp_file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, DelayqError::Config(_)));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/delayq.json")));
        assert!(matches!(result, Err(DelayqError::Config(ref msg)) if msg.contains("not found")));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("url: x", Path::new("delayq.yaml"));
        assert!(matches!(result, Err(DelayqError::Config(ref msg)) if msg.contains("yaml")));
    }
}
