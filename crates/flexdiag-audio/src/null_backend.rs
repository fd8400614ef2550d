use std::cell::RefCell;
use std::collections::HashMap;

use flexdiag_core::pa::{
    host_api_type, sample_format, DeviceIndex, DeviceInfo, HostApiIndex, HostApiInfo,
    SampleFormat, StreamCallbackTimeInfo, StreamInfo, StreamParameters, NO_DEVICE,
};
use flexdiag_core::{BackendError, WaveFormatExtensible};

use crate::backend::{
    check_request, check_stream_parameters, effective_latency, extensible_format, format_bits,
    integral_sample_rate, AudioBackend, CallbackContext, OpenStreamRequest, StreamCallback,
    StreamId,
};
use crate::logger;

/// Frames delivered per callback when the stream did not ask for a size.
const DEFAULT_FRAMES: u32 = 256;

/// A scripted device for the null backend.
#[derive(Debug, Clone)]
pub struct NullDevice {
    pub info: DeviceInfo,
    pub native_format: SampleFormat,
    pub sample_rates: Vec<f64>,
}

struct NullStream {
    request: OpenStreamRequest,
    /// Out of the map while it runs.
    callback: Option<StreamCallback>,
    running: bool,
    callbacks_fired: u64,
}

#[derive(Default)]
struct NullState {
    next_id: StreamId,
    streams: HashMap<StreamId, NullStream>,
    calls: Vec<String>,
    fail_open: bool,
    fail_start: bool,
}

/// In-memory backend with fixed host APIs and devices. Streams never run on
/// their own; `fire_callback` drives them.
pub struct NullBackend {
    host_apis: Vec<HostApiInfo>,
    devices: Vec<NullDevice>,
    state: RefCell<NullState>,
}

impl NullBackend {
    /// One WASAPI host API with a stereo input and a stereo output device.
    pub fn new() -> Self {
        let rates = vec![44100.0, 48000.0, 96000.0];
        let device = |name: &str, inputs: i32, outputs: i32| NullDevice {
            info: DeviceInfo {
                name: name.to_string(),
                host_api: 0,
                max_input_channels: inputs,
                max_output_channels: outputs,
                default_low_input_latency: if inputs > 0 { 0.01 } else { 0.0 },
                default_low_output_latency: if outputs > 0 { 0.01 } else { 0.0 },
                default_high_input_latency: if inputs > 0 { 0.04 } else { 0.0 },
                default_high_output_latency: if outputs > 0 { 0.04 } else { 0.0 },
                default_sample_rate: 48000.0,
            },
            native_format: sample_format::FLOAT32,
            sample_rates: rates.clone(),
        };
        Self::with_devices(
            vec![HostApiInfo {
                type_id: host_api_type::WASAPI,
                name: "Null WASAPI".to_string(),
                device_count: 2,
                default_input_device: 0,
                default_output_device: 1,
            }],
            vec![device("Null Input", 2, 0), device("Null Output", 0, 2)],
        )
    }

    pub fn with_devices(host_apis: Vec<HostApiInfo>, devices: Vec<NullDevice>) -> Self {
        Self {
            host_apis,
            devices,
            state: RefCell::new(NullState {
                next_id: 1,
                ..NullState::default()
            }),
        }
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.borrow_mut().fail_open = fail;
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.state.borrow_mut().fail_start = fail;
    }

    /// Every stream call made so far, e.g. `open 1`, `start 1`.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn open_stream_count(&self) -> usize {
        self.state.borrow().streams.len()
    }

    pub fn is_running(&self, id: StreamId) -> bool {
        self.state
            .borrow()
            .streams
            .get(&id)
            .is_some_and(|s| s.running)
    }

    /// Run one callback of a started stream synchronously. The backend is not
    /// borrowed while the callback runs, so it may query the backend.
    pub fn fire_callback(&self, id: StreamId) -> Result<(), BackendError> {
        let (mut callback, frames, input_channels, output_channels, now) = {
            let mut state = self.state.borrow_mut();
            let stream = state
                .streams
                .get_mut(&id)
                .ok_or(BackendError::BadStream(id))?;
            if !stream.running {
                return Err(BackendError::StreamStart(format!("stream {} is not running", id)));
            }
            let callback = stream.callback.take().ok_or_else(|| {
                BackendError::StreamStart(format!("stream {} is already in its callback", id))
            })?;

            let frames = (match stream.request.frames_per_buffer {
                0 => DEFAULT_FRAMES,
                n => n,
            }) as usize;
            let channels =
                |p: &Option<StreamParameters>| p.as_ref().map_or(0, |p| p.channel_count as usize);
            let now = stream.callbacks_fired as f64 * frames as f64 / stream.request.sample_rate;
            (
                callback,
                frames,
                channels(&stream.request.input),
                channels(&stream.request.output),
                now,
            )
        };

        let input = vec![0.0f32; frames * input_channels];
        let mut output = vec![0.0f32; frames * output_channels];
        let mut context = CallbackContext {
            input: &input,
            output: &mut output,
            frames,
            time_info: StreamCallbackTimeInfo {
                input_buffer_adc_time: now,
                current_time: now,
                output_buffer_dac_time: now,
            },
            flags: 0,
        };
        callback(&mut context);

        // The callback may have closed its own stream.
        if let Some(stream) = self.state.borrow_mut().streams.get_mut(&id) {
            stream.callback = Some(callback);
            stream.callbacks_fired += 1;
        }
        Ok(())
    }

    fn record(&self, call: String) {
        logger::debug_print("null", &call);
        self.state.borrow_mut().calls.push(call);
    }

    fn device(&self, index: DeviceIndex) -> Option<&NullDevice> {
        usize::try_from(index).ok().and_then(|i| self.devices.get(i))
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn version_text(&self) -> String {
        format!("null backend {}", env!("CARGO_PKG_VERSION"))
    }

    fn host_api_count(&self) -> HostApiIndex {
        self.host_apis.len() as HostApiIndex
    }

    fn host_api_info(&self, index: HostApiIndex) -> Option<HostApiInfo> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.host_apis.get(i))
            .cloned()
    }

    fn device_count(&self) -> DeviceIndex {
        self.devices.len() as DeviceIndex
    }

    fn device_info(&self, index: DeviceIndex) -> Option<DeviceInfo> {
        self.device(index).map(|d| d.info.clone())
    }

    fn default_input_device(&self) -> DeviceIndex {
        self.host_apis
            .first()
            .map_or(NO_DEVICE, |h| h.default_input_device)
    }

    fn default_output_device(&self) -> DeviceIndex {
        self.host_apis
            .first()
            .map_or(NO_DEVICE, |h| h.default_output_device)
    }

    fn device_default_format(
        &self,
        index: DeviceIndex,
    ) -> Result<WaveFormatExtensible, BackendError> {
        let device = self.device(index).ok_or(BackendError::DeviceNotFound(index))?;
        let (bits, is_float) =
            format_bits(device.native_format).ok_or_else(|| BackendError::DefaultFormat {
                device: index,
                reason: flexdiag_format::sample_format_string(device.native_format),
            })?;
        let channels = device
            .info
            .max_output_channels
            .max(device.info.max_input_channels);
        Ok(extensible_format(
            u16::try_from(channels.max(0)).unwrap_or(u16::MAX),
            integral_sample_rate(device.info.default_sample_rate)?,
            bits,
            is_float,
        ))
    }

    fn is_format_supported(
        &self,
        input: Option<&StreamParameters>,
        output: Option<&StreamParameters>,
        sample_rate: f64,
    ) -> Result<(), BackendError> {
        for (params, is_input) in [(input, true), (output, false)] {
            let Some(params) = params else { continue };
            check_stream_parameters(self, params, is_input)?;
            let supported = self
                .device(params.device)
                .is_some_and(|d| d.sample_rates.contains(&sample_rate));
            if !supported {
                return Err(BackendError::InvalidSampleRate(sample_rate));
            }
        }
        Ok(())
    }

    fn open_stream(
        &self,
        request: &OpenStreamRequest,
        callback: StreamCallback,
    ) -> Result<StreamId, BackendError> {
        check_request(self, request)?;
        if self.state.borrow().fail_open {
            return Err(BackendError::StreamOpen("injected failure".to_string()));
        }
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.streams.insert(
                id,
                NullStream {
                    request: request.clone(),
                    callback: Some(callback),
                    running: false,
                    callbacks_fired: 0,
                },
            );
            id
        };
        self.record(format!("open {}", id));
        Ok(id)
    }

    fn close_stream(&self, id: StreamId) -> Result<(), BackendError> {
        self.state
            .borrow_mut()
            .streams
            .remove(&id)
            .ok_or(BackendError::BadStream(id))?;
        self.record(format!("close {}", id));
        Ok(())
    }

    fn start_stream(&self, id: StreamId) -> Result<(), BackendError> {
        {
            let mut state = self.state.borrow_mut();
            if state.fail_start {
                return Err(BackendError::StreamStart("injected failure".to_string()));
            }
            let stream = state
                .streams
                .get_mut(&id)
                .ok_or(BackendError::BadStream(id))?;
            stream.running = true;
        }
        self.record(format!("start {}", id));
        Ok(())
    }

    fn stop_stream(&self, id: StreamId) -> Result<(), BackendError> {
        {
            let mut state = self.state.borrow_mut();
            let stream = state
                .streams
                .get_mut(&id)
                .ok_or(BackendError::BadStream(id))?;
            if !stream.running {
                return Err(BackendError::StreamStop(format!("stream {} is not running", id)));
            }
            stream.running = false;
        }
        self.record(format!("stop {}", id));
        Ok(())
    }

    fn stream_info(&self, id: StreamId) -> Result<StreamInfo, BackendError> {
        let state = self.state.borrow();
        let stream = state.streams.get(&id).ok_or(BackendError::BadStream(id))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stream_callback;
    use flexdiag_core::pa::stream_flags;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    thread_local! {
        static SHARED: RefCell<Option<Rc<NullBackend>>> = RefCell::new(None);
    }

    fn output_params(channels: i32) -> StreamParameters {
        StreamParameters {
            device: 1,
            channel_count: channels,
            sample_format: sample_format::FLOAT32,
            suggested_latency: 0.01,
            host_api_specific: None,
        }
    }

    fn output_request(sample_rate: f64) -> OpenStreamRequest {
        OpenStreamRequest {
            input: None,
            output: Some(output_params(2)),
            sample_rate,
            frames_per_buffer: 480,
            flags: stream_flags::NO_FLAG,
        }
    }

    #[test]
    fn test_default_devices() {
        let backend = NullBackend::new();
        assert_eq!(backend.default_input_device(), 0);
        assert_eq!(backend.default_output_device(), 1);
        assert_eq!(backend.device_count(), 2);
        assert!(backend.device_info(2).is_none());
        assert!(backend.device_info(-1).is_none());
    }

    #[test]
    fn test_open_start_fire_stop_close() {
        let backend = NullBackend::new();
        let frames_seen = Arc::new(AtomicUsize::new(0));
        let frames_flag = Arc::clone(&frames_seen);
        let id = backend
            .open_stream(
                &output_request(48000.0),
                stream_callback(move |ctx| {
                    assert_eq!(ctx.output.len(), ctx.frames * 2);
                    frames_flag.fetch_add(ctx.frames, Ordering::Relaxed);
                }),
            )
            .unwrap();

        assert!(backend.fire_callback(id).is_err(), "not started yet");
        backend.start_stream(id).unwrap();
        backend.fire_callback(id).unwrap();
        backend.fire_callback(id).unwrap();
        assert_eq!(frames_seen.load(Ordering::Relaxed), 960);
        backend.stop_stream(id).unwrap();
        backend.close_stream(id).unwrap();

        assert_eq!(
            backend.calls(),
            vec!["open 1", "start 1", "stop 1", "close 1"]
        );
        assert_eq!(backend.open_stream_count(), 0);
    }

    #[test]
    fn test_callback_can_query_backend() {
        let backend = Rc::new(NullBackend::new());
        SHARED.with(|shared| *shared.borrow_mut() = Some(Rc::clone(&backend)));
        let saw_running = Arc::new(AtomicBool::new(false));
        let saw_flag = Arc::clone(&saw_running);
        let id = backend
            .open_stream(
                &output_request(48000.0),
                stream_callback(move |_| {
                    SHARED.with(|shared| {
                        let shared = shared.borrow();
                        let backend = shared.as_ref().unwrap();
                        let running = backend.is_running(1)
                            && backend.stream_info(1).is_ok()
                            && backend.calls() == vec!["open 1", "start 1"];
                        saw_flag.store(running, Ordering::Relaxed);
                    });
                }),
            )
            .unwrap();
        backend.start_stream(id).unwrap();

        backend.fire_callback(id).unwrap();
        assert!(saw_running.load(Ordering::Relaxed));
        // The callback is back in place for the next buffer.
        backend.fire_callback(id).unwrap();

        SHARED.with(|shared| *shared.borrow_mut() = None);
    }

    #[test]
    fn test_unsupported_rate_rejected() {
        let backend = NullBackend::new();
        let result = backend.open_stream(&output_request(192000.0), stream_callback(|_| {}));
        assert!(matches!(result, Err(BackendError::InvalidSampleRate(r)) if r == 192000.0));
    }

    #[test]
    fn test_too_many_channels_rejected() {
        let backend = NullBackend::new();
        let result = backend.is_format_supported(None, Some(&output_params(3)), 48000.0);
        assert!(matches!(
            result,
            Err(BackendError::InvalidChannelCount { requested: 3, max: 2, .. })
        ));
    }

    #[test]
    fn test_output_params_on_input_device_rejected() {
        let backend = NullBackend::new();
        let params = StreamParameters {
            device: 0,
            ..output_params(2)
        };
        let result = backend.is_format_supported(None, Some(&params), 48000.0);
        assert!(matches!(
            result,
            Err(BackendError::InvalidChannelCount { max: 0, .. })
        ));
    }

    #[test]
    fn test_non_float_format_rejected() {
        let backend = NullBackend::new();
        let params = StreamParameters {
            sample_format: sample_format::INT16,
            ..output_params(2)
        };
        let result = backend.is_format_supported(None, Some(&params), 48000.0);
        assert!(matches!(result, Err(BackendError::SampleFormatNotSupported(_))));
    }

    #[test]
    fn test_no_parameters_rejected() {
        let backend = NullBackend::new();
        let request = OpenStreamRequest {
            output: None,
            ..output_request(48000.0)
        };
        let result = backend.open_stream(&request, stream_callback(|_| {}));
        assert!(matches!(result, Err(BackendError::NoParameters)));
    }

    #[test]
    fn test_injected_failures() {
        let backend = NullBackend::new();
        backend.set_fail_open(true);
        assert!(backend
            .open_stream(&output_request(48000.0), stream_callback(|_| {}))
            .is_err());
        backend.set_fail_open(false);
        let id = backend
            .open_stream(&output_request(48000.0), stream_callback(|_| {}))
            .unwrap();
        backend.set_fail_start(true);
        assert!(matches!(
            backend.start_stream(id),
            Err(BackendError::StreamStart(_))
        ));
        assert!(!backend.is_running(id));
    }

    #[test]
    fn test_stream_info_latency() {
        let backend = NullBackend::new();
        let id = backend
            .open_stream(&output_request(48000.0), stream_callback(|_| {}))
            .unwrap();
        let info = backend.stream_info(id).unwrap();
        assert_eq!(info.struct_version, 1);
        assert_eq!(info.input_latency, 0.0);
        assert_eq!(info.output_latency, 0.01);
        assert_eq!(info.sample_rate, 48000.0);
    }

    #[test]
    fn test_device_default_format() {
        let backend = NullBackend::new();
        let format = backend.device_default_format(1).unwrap();
        assert_eq!(format.channels, 2);
        assert_eq!(format.samples_per_sec, 48000);
        assert_eq!(format.bits_per_sample, 32);
        assert!(backend.device_default_format(7).is_err());
    }

    #[test]
    fn test_fractional_rate_rejected() {
        let backend = NullBackend::new();
        let result = backend.open_stream(&output_request(44100.5), stream_callback(|_| {}));
        assert!(matches!(result, Err(BackendError::InvalidSampleRate(r)) if r == 44100.5));
        assert_eq!(backend.open_stream_count(), 0);
    }

    #[test]
    fn test_default_format_of_huge_device_saturates() {
        let mut device = NullBackend::new().devices[1].clone();
        device.info.max_output_channels = 100_000;
        let backend = NullBackend::with_devices(NullBackend::new().host_apis, vec![device]);
        let format = backend.device_default_format(0).unwrap();
        assert_eq!(format.channels, u16::MAX);
        assert_eq!(format.block_align, u16::MAX);
    }

    #[test]
    fn test_bad_stream_id() {
        let backend = NullBackend::new();
        assert!(matches!(backend.stop_stream(9), Err(BackendError::BadStream(9))));
        assert!(matches!(backend.close_stream(9), Err(BackendError::BadStream(9))));
    }
}
