use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub harness: HarnessConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Redirect the backend's own debug output into the log.
    #[serde(default = "default_true")]
    pub backend_debug: bool,

    #[serde(default)]
    pub transcript_path: Option<PathBuf>,

    #[serde(default = "default_transcript_capacity")]
    pub transcript_capacity: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend_debug: default_true(),
            transcript_path: None,
            transcript_capacity: default_transcript_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarnessConfig {
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Restrict device lookup to one host API, by name.
    #[serde(default)]
    pub host_api: Option<String>,

    #[serde(default = "default_device_name")]
    pub input_device: String,

    #[serde(default = "default_device_name")]
    pub output_device: String,

    #[serde(default = "default_sample_rates")]
    pub sample_rates: Vec<f64>,

    /// The only rate whose negotiation failure fails the run.
    #[serde(default = "default_required_sample_rate")]
    pub required_sample_rate: f64,

    /// Overrides the driver's preferred buffer size.
    #[serde(default)]
    pub buffer_size: Option<i32>,

    /// Create buffers for at most this many input channels.
    #[serde(default)]
    pub input_channels: Option<i32>,

    #[serde(default)]
    pub output_channels: Option<i32>,

    #[serde(default = "default_run_millis")]
    pub run_millis: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host_api: None,
            input_device: default_device_name(),
            output_device: default_device_name(),
            sample_rates: default_sample_rates(),
            required_sample_rate: default_required_sample_rate(),
            buffer_size: None,
            input_channels: None,
            output_channels: None,
            run_millis: default_run_millis(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default)]
    pub host_api: Option<String>,

    /// No input stream when unset.
    #[serde(default)]
    pub input_device: Option<String>,

    /// No output stream when unset.
    #[serde(default = "default_output_device")]
    pub output_device: Option<String>,

    #[serde(default = "default_channels")]
    pub channels: i32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// 0 lets the backend choose.
    #[serde(default)]
    pub frames_per_buffer: u32,

    /// Seconds; the device's low latency when unset.
    #[serde(default)]
    pub suggested_latency: Option<f64>,

    #[serde(default)]
    pub clip_off: bool,

    #[serde(default)]
    pub dither_off: bool,

    #[serde(default = "default_seconds")]
    pub seconds: u64,

    #[serde(default)]
    pub wasapi: Option<WasapiConfig>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host_api: None,
            input_device: None,
            output_device: default_output_device(),
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            frames_per_buffer: 0,
            suggested_latency: None,
            clip_off: false,
            dither_off: false,
            seconds: default_seconds(),
            wasapi: None,
        }
    }
}

/// Attached to the stream parameters as WASAPI-specific stream info.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WasapiConfig {
    #[serde(default)]
    pub exclusive: bool,

    #[serde(default)]
    pub polling: bool,

    #[serde(default)]
    pub thread_priority: Option<String>,

    #[serde(default)]
    pub stream_category: Option<String>,

    #[serde(default)]
    pub stream_option: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_transcript_capacity() -> usize {
    10_000
}

fn default_driver() -> String {
    "cpal".to_string()
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_output_device() -> Option<String> {
    Some(default_device_name())
}

fn default_sample_rates() -> Vec<f64> {
    vec![44100.0, 96000.0, 192000.0, 48000.0]
}

fn default_required_sample_rate() -> f64 {
    48000.0
}

fn default_sample_rate() -> f64 {
    48000.0
}

fn default_run_millis() -> u64 {
    500
}

fn default_channels() -> i32 {
    2
}

fn default_seconds() -> u64 {
    5
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").expect("valid interpolation pattern");
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
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
        Ok(config)
    }

    /// Like `load_from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }
}
