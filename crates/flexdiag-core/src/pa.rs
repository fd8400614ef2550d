//! PortAudio-model vocabulary shared by the backends and the formatters.
//!
//! Numeric values match the PortAudio and `pa_win_wasapi.h` headers so that
//! logs can be compared against native traces.

pub type HostApiIndex = i32;
pub type DeviceIndex = i32;

/// "No device" marker used for default devices and stream parameters.
pub const NO_DEVICE: DeviceIndex = -1;

pub type HostApiTypeId = i32;

pub mod host_api_type {
    use super::HostApiTypeId;

    pub const IN_DEVELOPMENT: HostApiTypeId = 0;
    pub const DIRECT_SOUND: HostApiTypeId = 1;
    pub const MME: HostApiTypeId = 2;
    pub const ASIO: HostApiTypeId = 3;
    pub const SOUND_MANAGER: HostApiTypeId = 4;
    pub const CORE_AUDIO: HostApiTypeId = 5;
    pub const OSS: HostApiTypeId = 7;
    pub const ALSA: HostApiTypeId = 8;
    pub const AL: HostApiTypeId = 9;
    pub const BE_OS: HostApiTypeId = 10;
    pub const WDMKS: HostApiTypeId = 11;
    pub const JACK: HostApiTypeId = 12;
    pub const WASAPI: HostApiTypeId = 13;
    pub const AUDIO_SCIENCE_HPI: HostApiTypeId = 14;
}

pub type SampleFormat = u32;

pub mod sample_format {
    use super::SampleFormat;

    pub const FLOAT32: SampleFormat = 0x0000_0001;
    pub const INT32: SampleFormat = 0x0000_0002;
    pub const INT24: SampleFormat = 0x0000_0004;
    pub const INT16: SampleFormat = 0x0000_0008;
    pub const INT8: SampleFormat = 0x0000_0010;
    pub const UINT8: SampleFormat = 0x0000_0020;
    pub const CUSTOM_FORMAT: SampleFormat = 0x0001_0000;
    pub const NON_INTERLEAVED: SampleFormat = 0x8000_0000;
}

pub type StreamFlags = u32;

pub mod stream_flags {
    use super::StreamFlags;

    pub const NO_FLAG: StreamFlags = 0;
    pub const CLIP_OFF: StreamFlags = 0x0000_0001;
    pub const DITHER_OFF: StreamFlags = 0x0000_0002;
    pub const NEVER_DROP_INPUT: StreamFlags = 0x0000_0004;
    pub const PRIME_OUTPUT_BUFFERS_USING_STREAM_CALLBACK: StreamFlags = 0x0000_0008;
}

pub type StreamCallbackFlags = u32;

pub mod callback_flags {
    use super::StreamCallbackFlags;

    pub const INPUT_UNDERFLOW: StreamCallbackFlags = 0x0000_0001;
    pub const INPUT_OVERFLOW: StreamCallbackFlags = 0x0000_0002;
    pub const OUTPUT_UNDERFLOW: StreamCallbackFlags = 0x0000_0004;
    pub const OUTPUT_OVERFLOW: StreamCallbackFlags = 0x0000_0008;
    pub const PRIMING_OUTPUT: StreamCallbackFlags = 0x0000_0010;
}

pub type WasapiFlags = u32;

pub mod wasapi_flags {
    use super::WasapiFlags;

    pub const EXCLUSIVE: WasapiFlags = 1 << 0;
    pub const REDIRECT_HOST_PROCESSOR: WasapiFlags = 1 << 1;
    pub const USE_CHANNEL_MASK: WasapiFlags = 1 << 2;
    pub const POLLING: WasapiFlags = 1 << 3;
    pub const THREAD_PRIORITY: WasapiFlags = 1 << 4;
}

pub type ThreadPriority = i32;

pub mod thread_priority {
    use super::ThreadPriority;

    pub const NONE: ThreadPriority = 0;
    pub const AUDIO: ThreadPriority = 1;
    pub const CAPTURE: ThreadPriority = 2;
    pub const DISTRIBUTION: ThreadPriority = 3;
    pub const GAMES: ThreadPriority = 4;
    pub const PLAYBACK: ThreadPriority = 5;
    pub const PRO_AUDIO: ThreadPriority = 6;
    pub const WINDOW_MANAGER: ThreadPriority = 7;
}

pub type StreamCategory = i32;

pub mod stream_category {
    use super::StreamCategory;

    pub const OTHER: StreamCategory = 0;
    pub const COMMUNICATIONS: StreamCategory = 3;
    pub const ALERTS: StreamCategory = 4;
    pub const SOUND_EFFECTS: StreamCategory = 5;
    pub const GAME_EFFECTS: StreamCategory = 6;
    pub const GAME_MEDIA: StreamCategory = 7;
    pub const GAME_CHAT: StreamCategory = 8;
    pub const SPEECH: StreamCategory = 9;
    pub const MOVIE: StreamCategory = 10;
    pub const MEDIA: StreamCategory = 11;
}

pub type StreamOption = i32;

pub mod stream_option {
    use super::StreamOption;

    pub const NONE: StreamOption = 0;
    pub const RAW: StreamOption = 1;
    pub const MATCH_FORMAT: StreamOption = 2;
}

/// Byte size of `PaWasapiStreamInfo` on 64-bit targets.
pub const WASAPI_STREAM_INFO_SIZE: u32 = 56;
pub const WASAPI_STREAM_INFO_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct HostApiInfo {
    pub type_id: HostApiTypeId,
    pub name: String,
    pub device_count: i32,
    pub default_input_device: DeviceIndex,
    pub default_output_device: DeviceIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub name: String,
    pub host_api: HostApiIndex,
    pub max_input_channels: i32,
    pub max_output_channels: i32,
    pub default_low_input_latency: f64,
    pub default_low_output_latency: f64,
    pub default_high_input_latency: f64,
    pub default_high_output_latency: f64,
    pub default_sample_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasapiStreamInfo {
    pub flags: WasapiFlags,
    pub channel_mask: u32,
    /// Addresses of the host processor callbacks, 0 when unset.
    pub host_processor_output: usize,
    pub host_processor_input: usize,
    pub thread_priority: ThreadPriority,
    pub stream_category: StreamCategory,
    pub stream_option: StreamOption,
}

impl Default for WasapiStreamInfo {
    fn default() -> Self {
        Self {
            flags: 0,
            channel_mask: 0,
            host_processor_output: 0,
            host_processor_input: 0,
            thread_priority: thread_priority::NONE,
            stream_category: stream_category::OTHER,
            stream_option: stream_option::NONE,
        }
    }
}

/// Common header of host-API-specific stream info, with the WASAPI payload
/// when the header says so.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostApiSpecificStreamInfo {
    pub size: u32,
    pub host_api_type: HostApiTypeId,
    pub version: u32,
    pub wasapi: Option<WasapiStreamInfo>,
}

impl HostApiSpecificStreamInfo {
    pub fn wasapi(info: WasapiStreamInfo) -> Self {
        Self {
            size: WASAPI_STREAM_INFO_SIZE,
            host_api_type: host_api_type::WASAPI,
            version: WASAPI_STREAM_INFO_VERSION,
            wasapi: Some(info),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamParameters {
    pub device: DeviceIndex,
    pub channel_count: i32,
    pub sample_format: SampleFormat,
    /// Seconds.
    pub suggested_latency: f64,
    pub host_api_specific: Option<HostApiSpecificStreamInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub struct_version: i32,
    pub input_latency: f64,
    pub output_latency: f64,
    pub sample_rate: f64,
}

/// Times in seconds on the stream clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamCallbackTimeInfo {
    pub input_buffer_adc_time: f64,
    pub current_time: f64,
    pub output_buffer_dac_time: f64,
}
