use std::path::{Path, PathBuf};

use crate::api::validation::MAX_TEXT_CHARS;
use crate::config::schema::{Config, OUTPUT_PLACEHOLDER};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "VOICEGEN_CONFIG";

/// Loads a config file. Relative paths inside it are resolved against the
/// file's directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Finds and loads the active config: `$VOICEGEN_CONFIG`, then
/// `~/.voicegen/config.json`, then built-in defaults.
pub fn load_default_config() -> Result<Config, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => Ok(Config::default()),
    }
}

/// Loads `path` when given (e.g. from the command line), otherwise falls
/// back to [`load_default_config`].
pub fn load_config_or_default(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => load_default_config(),
    }
}

/// Returns the canonical config path: `~/.voicegen/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".voicegen").join("config.json"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.max_text_chars == 0 || config.max_text_chars > MAX_TEXT_CHARS {
        return Err(ConfigError::Validation {
            message: format!("max_text_chars must be between 1 and {}", MAX_TEXT_CHARS),
        });
    }
    if config.store.busy_timeout_ms == 0 {
        return Err(invalid("store.busy_timeout_ms must be non-zero"));
    }
    if config.server.port == 0 {
        return Err(invalid("server.port must be non-zero"));
    }
    if config.worker.poll_interval_ms == 0 {
        return Err(invalid("worker.poll_interval_ms must be non-zero"));
    }
    if config.synthesis.timeout_secs == 0 {
        return Err(invalid("synthesis.timeout_secs must be non-zero"));
    }
    if config.synthesis.program.trim().is_empty() {
        return Err(invalid("synthesis.program must not be empty"));
    }
    if !config
        .synthesis
        .args
        .iter()
        .any(|a| a.contains(OUTPUT_PLACEHOLDER))
    {
        return Err(ConfigError::Validation {
            message: format!(
                "synthesis.args must contain the '{}' placeholder",
                OUTPUT_PLACEHOLDER
            ),
        });
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
