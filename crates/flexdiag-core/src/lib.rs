pub mod asio;
pub mod config;
pub mod error;
pub mod log_layer;
pub mod pa;
pub mod wave;

pub use asio::{
    AsioError, AsioResult, AsioTime, BufferInfo, BufferSize, ChannelInfo, DriverInfo, Latencies,
    SampleType,
};
pub use config::AppConfig;
pub use error::{BackendError, ConfigError, HarnessError};
pub use log_layer::TranscriptLayer;
pub use pa::{
    DeviceIndex, DeviceInfo, HostApiIndex, HostApiInfo, StreamCallbackTimeInfo, StreamInfo,
    StreamParameters,
};
pub use wave::{Guid, WaveFormatExtensible};
