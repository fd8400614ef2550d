use flexdiag_core::pa::{
    sample_format, DeviceIndex, DeviceInfo, HostApiIndex, HostApiInfo, SampleFormat,
    StreamCallbackFlags, StreamCallbackTimeInfo, StreamFlags, StreamInfo, StreamParameters,
};
use flexdiag_core::wave::{format_tag, sub_format};
use flexdiag_core::{BackendError, WaveFormatExtensible};
use flexdiag_format::default_channel_mask;

pub type StreamId = u64;

/// What a stream callback gets to see of one buffer.
pub struct CallbackContext<'a> {
    /// Interleaved input samples, empty for output-only invocations.
    pub input: &'a [f32],
    /// Interleaved output samples, pre-filled with silence.
    pub output: &'a mut [f32],
    pub frames: usize,
    pub time_info: StreamCallbackTimeInfo,
    pub flags: StreamCallbackFlags,
}

pub type StreamCallback = Box<dyn FnMut(&mut CallbackContext<'_>) + Send>;

/// Box a closure as a `StreamCallback`.
pub fn stream_callback<F>(f: F) -> StreamCallback
where
    F: FnMut(&mut CallbackContext<'_>) + Send + 'static,
{
    Box::new(f)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenStreamRequest {
    pub input: Option<StreamParameters>,
    pub output: Option<StreamParameters>,
    pub sample_rate: f64,
    /// 0 lets the backend choose.
    pub frames_per_buffer: u32,
    pub flags: StreamFlags,
}

/// The native audio library, seen the way PortAudio presents it: host APIs,
/// globally indexed devices and callback streams.
pub trait AudioBackend {
    fn name(&self) -> &str;
    fn version_text(&self) -> String;

    fn host_api_count(&self) -> HostApiIndex;
    fn host_api_info(&self, index: HostApiIndex) -> Option<HostApiInfo>;
    fn device_count(&self) -> DeviceIndex;
    fn device_info(&self, index: DeviceIndex) -> Option<DeviceInfo>;
    fn default_input_device(&self) -> DeviceIndex;
    fn default_output_device(&self) -> DeviceIndex;
    fn device_default_format(&self, index: DeviceIndex)
        -> Result<WaveFormatExtensible, BackendError>;

    fn is_format_supported(
        &self,
        input: Option<&StreamParameters>,
        output: Option<&StreamParameters>,
        sample_rate: f64,
    ) -> Result<(), BackendError>;

    fn open_stream(
        &self,
        request: &OpenStreamRequest,
        callback: StreamCallback,
    ) -> Result<StreamId, BackendError>;
    fn close_stream(&self, id: StreamId) -> Result<(), BackendError>;
    fn start_stream(&self, id: StreamId) -> Result<(), BackendError>;
    fn stop_stream(&self, id: StreamId) -> Result<(), BackendError>;
    fn stream_info(&self, id: StreamId) -> Result<StreamInfo, BackendError>;
}

/// Checks shared by every backend: the device exists, has enough channels in
/// that direction, and the sample format is interleaved `Float32`.
pub(crate) fn check_stream_parameters<B: AudioBackend + ?Sized>(
    backend: &B,
    parameters: &StreamParameters,
    is_input: bool,
) -> Result<DeviceInfo, BackendError> {
    let info = backend
        .device_info(parameters.device)
        .ok_or(BackendError::DeviceNotFound(parameters.device))?;
    let max = if is_input {
        info.max_input_channels
    } else {
        info.max_output_channels
    };
    if parameters.channel_count < 1 || parameters.channel_count > max {
        return Err(BackendError::InvalidChannelCount {
            device: parameters.device,
            requested: parameters.channel_count,
            max,
        });
    }
    if parameters.sample_format != sample_format::FLOAT32 {
        return Err(BackendError::SampleFormatNotSupported(
            flexdiag_format::sample_format_string(parameters.sample_format),
        ));
    }
    Ok(info)
}

pub(crate) fn check_request<B: AudioBackend + ?Sized>(
    backend: &B,
    request: &OpenStreamRequest,
) -> Result<(), BackendError> {
    if request.input.is_none() && request.output.is_none() {
        return Err(BackendError::NoParameters);
    }
    integral_sample_rate(request.sample_rate)?;
    backend.is_format_supported(
        request.input.as_ref(),
        request.output.as_ref(),
        request.sample_rate,
    )
}

/// Backends clock streams in whole hertz; anything else is rejected rather
/// than truncated.
pub(crate) fn integral_sample_rate(sample_rate: f64) -> Result<u32, BackendError> {
    if !sample_rate.is_finite()
        || sample_rate < 1.0
        || sample_rate.fract() != 0.0
        || sample_rate > f64::from(u32::MAX)
    {
        return Err(BackendError::InvalidSampleRate(sample_rate));
    }
    Ok(sample_rate as u32)
}

/// Latency a stream will actually run with: the suggestion, or one buffer if
/// that is longer.
pub(crate) fn effective_latency(
    parameters: Option<&StreamParameters>,
    sample_rate: f64,
    frames_per_buffer: u32,
) -> f64 {
    parameters.map_or(0.0, |p| {
        p.suggested_latency
            .max(f64::from(frames_per_buffer) / sample_rate)
    })
}

/// The `WAVEFORMATEXTENSIBLE` a shared-mode endpoint would report for the given
/// stream shape.
pub fn extensible_format(
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    is_float: bool,
) -> WaveFormatExtensible {
    // Saturates instead of wrapping for shapes no endpoint reports.
    let block_align =
        u16::try_from(u32::from(channels) * u32::from(bits_per_sample / 8)).unwrap_or(u16::MAX);
    WaveFormatExtensible {
        format_tag: format_tag::EXTENSIBLE,
        channels,
        samples_per_sec: sample_rate,
        avg_bytes_per_sec: sample_rate.saturating_mul(u32::from(block_align)),
        block_align,
        bits_per_sample,
        valid_bits_per_sample: bits_per_sample,
        channel_mask: default_channel_mask(channels),
        sub_format: if is_float {
            sub_format::IEEE_FLOAT
        } else {
            sub_format::PCM
        },
    }
}

pub(crate) fn format_bits(format: SampleFormat) -> Option<(u16, bool)> {
    match format & !sample_format::NON_INTERLEAVED {
        sample_format::FLOAT32 => Some((32, true)),
        sample_format::INT32 => Some((32, false)),
        sample_format::INT24 => Some((24, false)),
        sample_format::INT16 => Some((16, false)),
        sample_format::INT8 | sample_format::UINT8 => Some((8, false)),
        _ => None,
    }
}
