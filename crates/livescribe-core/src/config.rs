use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub destinations: Vec<DestinationRouteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Which decoder backend to use and where its assets live.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub scorer: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            models_dir: default_models_dir(),
            model: String::new(),
            scorer: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Samples per frame handed to the decoder.
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    /// Capture ring buffer length, in seconds of audio.
    #[serde(default = "default_ring_seconds")]
    pub ring_seconds: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            frame_size: default_frame_size(),
            ring_seconds: default_ring_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DestinationRouteConfig {
    pub plugin: String,

    #[serde(default)]
    pub prefix: String,

    #[serde(flatten)]
    pub extra: toml::Value,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backend() -> String {
    "null".to_string()
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_frame_size() -> usize {
    2048
}

fn default_ring_seconds() -> u32 {
    2
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex");
    let mut result = input.to_string();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let value = std::env::var(var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        tracing::debug!(
            backend = %config.model.backend,
            destinations = config.destinations.len(),
            "configuration parsed"
        );
        Ok(config)
    }
}
