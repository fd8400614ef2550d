use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig, StreamInstant, SupportedBufferSize, SupportedStreamConfigRange};
use flexdiag_core::pa::{
    host_api_type, sample_format, DeviceIndex, DeviceInfo, HostApiIndex, HostApiInfo,
    SampleFormat, StreamCallbackTimeInfo, StreamInfo, StreamParameters, NO_DEVICE,
};
use flexdiag_core::{BackendError, WaveFormatExtensible};
use flexdiag_format::portaudio::HOST_API_TYPES;
use flexdiag_format::{find_by_name, join};
use ringbuf::traits::{Consumer, Producer};

use crate::backend::{
    check_request, check_stream_parameters, effective_latency, extensible_format, format_bits,
    integral_sample_rate, AudioBackend, CallbackContext, OpenStreamRequest, StreamCallback,
    StreamId,
};
use crate::{create_ring_buffer, logger};

const DEFAULT_LOW_LATENCY: f64 = 0.01;
const DEFAULT_HIGH_LATENCY: f64 = 0.1;
/// Input samples buffered between the capture and playback sides of a duplex
/// stream, in seconds.
const DUPLEX_BUFFER_SECONDS: f64 = 0.5;

struct CpalHostApi {
    info: HostApiInfo,
}

struct CpalDevice {
    info: DeviceInfo,
    device: cpal::Device,
    input_configs: Vec<SupportedStreamConfigRange>,
    output_configs: Vec<SupportedStreamConfigRange>,
    /// Channels, rate and format of the shared-mode default config.
    default_config: Result<(u16, u32, SampleFormat), String>,
}

struct CpalStream {
    request: OpenStreamRequest,
    input: Option<cpal::Stream>,
    output: Option<cpal::Stream>,
    running: bool,
}

impl CpalStream {
    fn streams(&self) -> impl Iterator<Item = &cpal::Stream> {
        self.input.iter().chain(self.output.iter())
    }
}

/// `AudioBackend` over every host cpal can open. Devices are numbered
/// globally, host by host, when the backend is created.
pub struct CpalBackend {
    host_apis: Vec<CpalHostApi>,
    devices: Vec<CpalDevice>,
    default_host: HostApiIndex,
    next_id: Cell<StreamId>,
    streams: RefCell<HashMap<StreamId, CpalStream>>,
}

impl CpalBackend {
    pub fn new() -> Result<Self, BackendError> {
        let default_host_id = cpal::default_host().id();
        let mut host_apis = Vec::new();
        let mut devices = Vec::new();
        let mut default_host = 0;

        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    tracing::warn!("skipping host {}: {}", host_id.name(), e);
                    continue;
                }
            };
            let host_index = host_apis.len() as HostApiIndex;
            if host_id == default_host_id {
                default_host = host_index;
            }

            let first_device = devices.len() as DeviceIndex;
            let host_devices = host
                .devices()
                .map_err(|e| BackendError::DeviceEnumeration(e.to_string()))?;
            for device in host_devices {
                devices.push(snapshot_device(device, host_index));
            }
            let device_count = devices.len() as DeviceIndex - first_device;

            let find_default = |default: Option<cpal::Device>| {
                let name = default.and_then(|d| d.name().ok());
                name.and_then(|name| {
                    devices[first_device as usize..]
                        .iter()
                        .position(|d| d.info.name == name)
                        .map(|i| first_device + i as DeviceIndex)
                })
                .unwrap_or(NO_DEVICE)
            };
            let default_input_device = find_default(host.default_input_device());
            let default_output_device = find_default(host.default_output_device());

            host_apis.push(CpalHostApi {
                info: HostApiInfo {
                    type_id: find_by_name(host_id.name(), HOST_API_TYPES)
                        .unwrap_or(host_api_type::IN_DEVELOPMENT),
                    name: host_id.name().to_string(),
                    device_count,
                    default_input_device,
                    default_output_device,
                },
            });
        }

        tracing::debug!(
            "cpal backend found {} host APIs and {} devices",
            host_apis.len(),
            devices.len()
        );
        Ok(Self {
            host_apis,
            devices,
            default_host,
            next_id: Cell::new(1),
            streams: RefCell::new(HashMap::new()),
        })
    }

    fn device(&self, index: DeviceIndex) -> Option<&CpalDevice> {
        usize::try_from(index).ok().and_then(|i| self.devices.get(i))
    }

    fn default_host_api(&self) -> Option<&HostApiInfo> {
        usize::try_from(self.default_host)
            .ok()
            .and_then(|i| self.host_apis.get(i))
            .map(|h| &h.info)
    }

    fn build_input(
        &self,
        parameters: &StreamParameters,
        config: &StreamConfig,
        mut deliver: impl FnMut(&[f32], StreamCallbackTimeInfo) + Send + 'static,
    ) -> Result<cpal::Stream, BackendError> {
        let device = self
            .device(parameters.device)
            .ok_or(BackendError::DeviceNotFound(parameters.device))?;
        let mut origin: Option<StreamInstant> = None;
        device
            .device
            .build_input_stream(
                config,
                move |data: &[f32], info: &cpal::InputCallbackInfo| {
                    let stamp = info.timestamp();
                    let origin = *origin.get_or_insert(stamp.callback);
                    let time_info = StreamCallbackTimeInfo {
                        input_buffer_adc_time: seconds_since(&stamp.capture, &origin),
                        current_time: seconds_since(&stamp.callback, &origin),
                        output_buffer_dac_time: 0.0,
                    };
                    deliver(data, time_info);
                },
                stream_error_callback("input"),
                None,
            )
            .map_err(|e| BackendError::StreamOpen(e.to_string()))
    }

    fn build_output(
        &self,
        parameters: &StreamParameters,
        config: &StreamConfig,
        mut render: impl FnMut(&mut [f32], StreamCallbackTimeInfo) + Send + 'static,
    ) -> Result<cpal::Stream, BackendError> {
        let device = self
            .device(parameters.device)
            .ok_or(BackendError::DeviceNotFound(parameters.device))?;
        let mut origin: Option<StreamInstant> = None;
        device
            .device
            .build_output_stream(
                config,
                move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                    let stamp = info.timestamp();
                    let origin = *origin.get_or_insert(stamp.callback);
                    let current_time = seconds_since(&stamp.callback, &origin);
                    let time_info = StreamCallbackTimeInfo {
                        input_buffer_adc_time: current_time,
                        current_time,
                        output_buffer_dac_time: seconds_since(&stamp.playback, &origin),
                    };
                    data.fill(0.0);
                    render(data, time_info);
                },
                stream_error_callback("output"),
                None,
            )
            .map_err(|e| BackendError::StreamOpen(e.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn version_text(&self) -> String {
        format!(
            "cpal with hosts: {}",
            join(&self.host_apis, ", ", |h| h.info.name.clone())
        )
    }

    fn host_api_count(&self) -> HostApiIndex {
        self.host_apis.len() as HostApiIndex
    }

    fn host_api_info(&self, index: HostApiIndex) -> Option<HostApiInfo> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.host_apis.get(i))
            .map(|h| h.info.clone())
    }

    fn device_count(&self) -> DeviceIndex {
        self.devices.len() as DeviceIndex
    }

    fn device_info(&self, index: DeviceIndex) -> Option<DeviceInfo> {
        self.device(index).map(|d| d.info.clone())
    }

    fn default_input_device(&self) -> DeviceIndex {
        self.default_host_api()
            .map_or(NO_DEVICE, |h| h.default_input_device)
    }

    fn default_output_device(&self) -> DeviceIndex {
        self.default_host_api()
            .map_or(NO_DEVICE, |h| h.default_output_device)
    }

    fn device_default_format(
        &self,
        index: DeviceIndex,
    ) -> Result<WaveFormatExtensible, BackendError> {
        let device = self.device(index).ok_or(BackendError::DeviceNotFound(index))?;
        let (channels, rate, format) =
            device
                .default_config
                .clone()
                .map_err(|reason| BackendError::DefaultFormat {
                    device: index,
                    reason,
                })?;
        let (bits, is_float) = format_bits(format).ok_or_else(|| BackendError::DefaultFormat {
            device: index,
            reason: flexdiag_format::sample_format_string(format),
        })?;
        Ok(extensible_format(channels, rate, bits, is_float))
    }

    fn is_format_supported(
        &self,
        input: Option<&StreamParameters>,
        output: Option<&StreamParameters>,
        sample_rate: f64,
    ) -> Result<(), BackendError> {
        let rate = integral_sample_rate(sample_rate)?;
        for (params, is_input) in [(input, true), (output, false)] {
            let Some(params) = params else { continue };
            check_stream_parameters(self, params, is_input)?;
            let device = self
                .device(params.device)
                .ok_or(BackendError::DeviceNotFound(params.device))?;
            let configs = if is_input {
                &device.input_configs
            } else {
                &device.output_configs
            };
            let supported = configs.iter().any(|c| {
                c.channels() == params.channel_count as u16
                    && c.sample_format() == cpal::SampleFormat::F32
                    && c.min_sample_rate().0 <= rate
                    && rate <= c.max_sample_rate().0
            });
            if !supported {
                return Err(BackendError::InvalidSampleRate(sample_rate));
            }
        }
        Ok(())
    }

    fn open_stream(
        &self,
        request: &OpenStreamRequest,
        mut callback: StreamCallback,
    ) -> Result<StreamId, BackendError> {
        check_request(self, request)?;
        let rate = integral_sample_rate(request.sample_rate)?;

        let config = |params: &StreamParameters| StreamConfig {
            channels: params.channel_count as u16,
            sample_rate: SampleRate(rate),
            buffer_size: match request.frames_per_buffer {
                0 => cpal::BufferSize::Default,
                frames => cpal::BufferSize::Fixed(frames),
            },
        };

        let (input, output) = match (&request.input, &request.output) {
            (Some(in_params), Some(out_params)) => {
                let in_channels = in_params.channel_count as usize;
                let out_channels = out_params.channel_count as usize;
                let capacity = (request.sample_rate * DUPLEX_BUFFER_SECONDS) as usize * in_channels;
                let (mut producer, mut consumer) = create_ring_buffer::<f32>(capacity.max(1));

                let input = self.build_input(in_params, &config(in_params), move |data, _| {
                    producer.push_slice(data);
                })?;
                let mut captured: Vec<f32> = Vec::new();
                let output = self.build_output(out_params, &config(out_params), move |data, time_info| {
                    let frames = data.len() / out_channels;
                    captured.resize(frames * in_channels, 0.0);
                    let popped = consumer.pop_slice(&mut captured);
                    captured[popped..].fill(0.0);
                    callback(&mut CallbackContext {
                        input: &captured,
                        output: data,
                        frames,
                        time_info,
                        flags: 0,
                    });
                })?;
                (Some(input), Some(output))
            }
            (Some(in_params), None) => {
                let channels = in_params.channel_count as usize;
                let input = self.build_input(in_params, &config(in_params), move |data, time_info| {
                    callback(&mut CallbackContext {
                        input: data,
                        output: &mut [],
                        frames: data.len() / channels,
                        time_info,
                        flags: 0,
                    });
                })?;
                (Some(input), None)
            }
            (None, Some(out_params)) => {
                let channels = out_params.channel_count as usize;
                let output = self.build_output(out_params, &config(out_params), move |data, time_info| {
                    let frames = data.len() / channels;
                    callback(&mut CallbackContext {
                        input: &[],
                        output: data,
                        frames,
                        time_info,
                        flags: 0,
                    });
                })?;
                (None, Some(output))
            }
            (None, None) => return Err(BackendError::NoParameters),
        };

        let stream = CpalStream {
            request: request.clone(),
            input,
            output,
            running: false,
        };
        // Some hosts start playing as soon as the stream is built.
        for s in stream.streams() {
            if let Err(e) = s.pause() {
                logger::debug_print("cpal", &format!("pause after build failed: {}", e));
            }
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.streams.borrow_mut().insert(id, stream);
        logger::debug_print("cpal", &format!("opened stream {}", id));
        Ok(id)
    }

    fn close_stream(&self, id: StreamId) -> Result<(), BackendError> {
        let stream = self
            .streams
            .borrow_mut()
            .remove(&id)
            .ok_or(BackendError::BadStream(id))?;
        drop(stream);
        logger::debug_print("cpal", &format!("closed stream {}", id));
        Ok(())
    }

    fn start_stream(&self, id: StreamId) -> Result<(), BackendError> {
        let mut streams = self.streams.borrow_mut();
        let stream = streams.get_mut(&id).ok_or(BackendError::BadStream(id))?;
        // Input first so the duplex ring buffer is filling before playback pulls.
        let sides: Vec<&cpal::Stream> = stream.streams().collect();
        play_all(
            &sides,
            |s| s.play().map_err(|e| e.to_string()),
            |s| s.pause().map_err(|e| e.to_string()),
        )?;
        stream.running = true;
        logger::debug_print("cpal", &format!("started stream {}", id));
        Ok(())
    }

    fn stop_stream(&self, id: StreamId) -> Result<(), BackendError> {
        let mut streams = self.streams.borrow_mut();
        let stream = streams.get_mut(&id).ok_or(BackendError::BadStream(id))?;
        if !stream.running {
            return Err(BackendError::StreamStop(format!("stream {} is not running", id)));
        }
        for s in stream.streams() {
            s.pause()
                .map_err(|e| BackendError::StreamStop(e.to_string()))?;
        }
        stream.running = false;
        logger::debug_print("cpal", &format!("stopped stream {}", id));
        Ok(())
    }

    fn stream_info(&self, id: StreamId) -> Result<StreamInfo, BackendError> {
        let streams = self.streams.borrow();
        let stream = streams.get(&id).ok_or(BackendError::BadStream(id))?;
        let request = &stream.request;
        Ok(StreamInfo {
            struct_version: 1,
            input_latency: effective_latency(
                request.input.as_ref(),
                request.sample_rate,
                request.frames_per_buffer,
            ),
            output_latency: effective_latency(
                request.output.as_ref(),
                request.sample_rate,
                request.frames_per_buffer,
            ),
            sample_rate: request.sample_rate,
        })
    }
}

fn snapshot_device(device: cpal::Device, host_api: HostApiIndex) -> CpalDevice {
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let input_configs: Vec<_> = device
        .supported_input_configs()
        .map(|configs| configs.collect())
        .unwrap_or_default();
    let output_configs: Vec<_> = device
        .supported_output_configs()
        .map(|configs| configs.collect())
        .unwrap_or_default();
    let max_channels = |configs: &[SupportedStreamConfigRange]| {
        configs.iter().map(|c| i32::from(c.channels())).max().unwrap_or(0)
    };
    let max_input_channels = max_channels(&input_configs);
    let max_output_channels = max_channels(&output_configs);

    let default_config = if max_output_channels > 0 {
        device.default_output_config()
    } else {
        device.default_input_config()
    };
    let (default_sample_rate, low_latency, high_latency) = match &default_config {
        Ok(config) => {
            let rate = f64::from(config.sample_rate().0);
            let (low, high) = buffer_latencies(config.buffer_size(), rate);
            (rate, low, high)
        }
        Err(_) => (0.0, DEFAULT_LOW_LATENCY, DEFAULT_HIGH_LATENCY),
    };
    let per_direction = |channels: i32, latency: f64| if channels > 0 { latency } else { 0.0 };

    CpalDevice {
        info: DeviceInfo {
            name,
            host_api,
            max_input_channels,
            max_output_channels,
            default_low_input_latency: per_direction(max_input_channels, low_latency),
            default_low_output_latency: per_direction(max_output_channels, low_latency),
            default_high_input_latency: per_direction(max_input_channels, high_latency),
            default_high_output_latency: per_direction(max_output_channels, high_latency),
            default_sample_rate,
        },
        device,
        input_configs,
        output_configs,
        default_config: default_config
            .map(|c| {
                (
                    c.channels(),
                    c.sample_rate().0,
                    sample_format_from_cpal(c.sample_format()),
                )
            })
            .map_err(|e| e.to_string()),
    }
}

/// Plays every side in order. If one fails, the sides already playing are
/// paused again so the stream is never left half started.
fn play_all<S>(
    sides: &[S],
    play: impl Fn(&S) -> Result<(), String>,
    pause: impl Fn(&S) -> Result<(), String>,
) -> Result<(), BackendError> {
    for (started, side) in sides.iter().enumerate() {
        if let Err(reason) = play(side) {
            for running in &sides[..started] {
                if let Err(e) = pause(running) {
                    logger::debug_print("cpal", &format!("pause after failed start: {}", e));
                }
            }
            return Err(BackendError::StreamStart(reason));
        }
    }
    Ok(())
}

fn buffer_latencies(buffer_size: &SupportedBufferSize, sample_rate: f64) -> (f64, f64) {
    match buffer_size {
        SupportedBufferSize::Range { min, max } if sample_rate > 0.0 => (
            f64::from(*min) / sample_rate,
            f64::from(*max) / sample_rate,
        ),
        _ => (DEFAULT_LOW_LATENCY, DEFAULT_HIGH_LATENCY),
    }
}

fn sample_format_from_cpal(format: cpal::SampleFormat) -> SampleFormat {
    match format {
        cpal::SampleFormat::F32 => sample_format::FLOAT32,
        cpal::SampleFormat::I32 => sample_format::INT32,
        cpal::SampleFormat::I16 => sample_format::INT16,
        cpal::SampleFormat::I8 => sample_format::INT8,
        cpal::SampleFormat::U8 => sample_format::UINT8,
        _ => sample_format::CUSTOM_FORMAT,
    }
}

fn seconds_since(instant: &StreamInstant, origin: &StreamInstant) -> f64 {
    instant
        .duration_since(origin)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

fn stream_error_callback(direction: &'static str) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        let line = format!("{} stream error: {}", direction, err);
        if !logger::debug_print("cpal", &line) {
            tracing::warn!("{}", line);
        }
    }
}
