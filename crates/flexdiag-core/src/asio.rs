/// Status code returned by every ASIO call (`ASIOError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsioError(pub i32);

impl AsioError {
    pub const OK: Self = Self(0);
    /// Unique success value for `ASIOFuture` calls.
    pub const SUCCESS: Self = Self(0x3f48_47a0);
    pub const NOT_PRESENT: Self = Self(-1000);
    pub const HW_MALFUNCTION: Self = Self(-999);
    pub const INVALID_PARAMETER: Self = Self(-998);
    pub const INVALID_MODE: Self = Self(-997);
    pub const SP_NOT_ADVANCING: Self = Self(-996);
    pub const NO_CLOCK: Self = Self(-995);
    pub const NO_MEMORY: Self = Self(-994);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

/// Result of a driver call. `Err` never carries `AsioError::OK`.
pub type AsioResult<T> = Result<T, AsioError>;

/// Sample layout of one ASIO channel (`ASIOSampleType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleType(pub i32);

impl SampleType {
    pub const INT16_MSB: Self = Self(0);
    pub const INT24_MSB: Self = Self(1);
    pub const INT32_MSB: Self = Self(2);
    pub const FLOAT32_MSB: Self = Self(3);
    pub const FLOAT64_MSB: Self = Self(4);
    pub const INT32_MSB16: Self = Self(8);
    pub const INT32_MSB18: Self = Self(9);
    pub const INT32_MSB20: Self = Self(10);
    pub const INT32_MSB24: Self = Self(11);
    pub const INT16_LSB: Self = Self(16);
    pub const INT24_LSB: Self = Self(17);
    pub const INT32_LSB: Self = Self(18);
    pub const FLOAT32_LSB: Self = Self(19);
    pub const FLOAT64_LSB: Self = Self(20);
    pub const INT32_LSB16: Self = Self(24);
    pub const INT32_LSB18: Self = Self(25);
    pub const INT32_LSB20: Self = Self(26);
    pub const INT32_LSB24: Self = Self(27);
    pub const DSD_INT8_LSB1: Self = Self(32);
    pub const DSD_INT8_MSB1: Self = Self(33);
    pub const DSD_INT8_NER8: Self = Self(40);
}

pub type SampleRate = f64;

/// Filled in by `ASIOInit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverInfo {
    pub asio_version: i32,
    pub driver_version: i32,
    pub name: String,
    pub error_message: String,
    pub sys_ref: usize,
}

/// Buffer size bounds in frames. A granularity of -1 means the driver only
/// accepts powers of two between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize {
    pub min: i32,
    pub max: i32,
    pub preferred: i32,
    pub granularity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub channel: i32,
    pub is_input: bool,
    pub is_active: bool,
    pub channel_group: i32,
    pub sample_type: SampleType,
    pub name: String,
}

/// Opaque handle of one half of a channel's double buffer.
pub type BufferId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub is_input: bool,
    pub channel_num: i32,
    /// Set by the driver in `create_buffers`.
    pub buffers: [Option<BufferId>; 2],
}

impl BufferInfo {
    pub fn new(is_input: bool, channel_num: i32) -> Self {
        Self {
            is_input,
            channel_num,
            buffers: [None, None],
        }
    }
}

/// Input and output latency in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latencies {
    pub input: i32,
    pub output: i32,
}

/// Timing passed to `bufferSwitchTimeInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AsioTime {
    /// Frames processed since `start`.
    pub sample_position: i64,
    /// Seconds on the stream clock.
    pub system_time: f64,
    pub sample_rate: f64,
}

/// `asioMessage` selectors.
pub mod message {
    pub const SELECTOR_SUPPORTED: i32 = 1;
    pub const ENGINE_VERSION: i32 = 2;
    pub const RESET_REQUEST: i32 = 3;
    pub const BUFFER_SIZE_CHANGE: i32 = 4;
    pub const RESYNC_REQUEST: i32 = 5;
    pub const LATENCIES_CHANGED: i32 = 6;
    pub const SUPPORTS_TIME_INFO: i32 = 7;
    pub const SUPPORTS_TIME_CODE: i32 = 8;
}
