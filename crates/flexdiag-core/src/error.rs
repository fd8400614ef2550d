use thiserror::Error;

use crate::pa::{DeviceIndex, HostApiIndex};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("unknown {kind} name: {name}")]
    UnknownName { kind: &'static str, name: String },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unable to get host API info for host API index {0}")]
    HostApiNotFound(HostApiIndex),

    #[error("Unable to get device info for device index {0}")]
    DeviceNotFound(DeviceIndex),

    #[error("no host API matches '{0}'")]
    NoMatchingHostApi(String),

    #[error("no device matches '{0}'")]
    NoMatchingDevice(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("unable to get default format for device {device}: {reason}")]
    DefaultFormat { device: DeviceIndex, reason: String },

    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),

    #[error("invalid channel count {requested} for device {device} (max {max})")]
    InvalidChannelCount {
        device: DeviceIndex,
        requested: i32,
        max: i32,
    },

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("stream has neither input nor output parameters")]
    NoParameters,

    #[error("unable to open stream: {0}")]
    StreamOpen(String),

    #[error("unable to start stream: {0}")]
    StreamStart(String),

    #[error("unable to stop stream: {0}")]
    StreamStop(String),

    #[error("no stream with id {0}")]
    BadStream(u64),
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("driver not found: {0}")]
    DriverNotFound(String),

    #[error("failed to set up driver backend: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to write harness output: {0}")]
    Output(#[from] std::io::Error),
}
