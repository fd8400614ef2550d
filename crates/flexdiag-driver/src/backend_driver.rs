use std::rc::Rc;
use std::sync::{Arc, Mutex};

use flexdiag_audio::{
    open_stream, start_stream, stream_callback, ActiveStream, AudioBackend, BackendLogger, Device,
    DeviceManager, Stream,
};
use flexdiag_core::asio::message;
use flexdiag_core::config::HarnessConfig;
use flexdiag_core::pa::{sample_format, stream_flags, StreamParameters};
use flexdiag_core::{
    AsioError, AsioResult, AsioTime, BufferInfo, BufferSize, ChannelInfo, Latencies,
};
use flexdiag_format::{channel_names, default_channel_mask, sample_type_from_format};

use crate::driver_trait::{
    assign_buffer_ids, buffer_size_allowed, validate_buffer_infos, AsioCallbacks, AsioDriver,
};

const DRIVER_VERSION: i32 = 1;

struct SelectedDevices {
    input: Option<Device>,
    output: Option<Device>,
}

impl SelectedDevices {
    fn input_channels(&self) -> i32 {
        self.input.as_ref().map_or(0, |d| d.info.max_input_channels)
    }

    fn output_channels(&self) -> i32 {
        self.output.as_ref().map_or(0, |d| d.info.max_output_channels)
    }
}

struct Buffers {
    infos: Vec<BufferInfo>,
    size: i32,
    callbacks: Arc<Mutex<Box<dyn AsioCallbacks>>>,
    /// The host asked for `buffer_switch_time_info` instead of `buffer_switch`.
    time_info: bool,
}

impl Buffers {
    fn has_direction(&self, is_input: bool) -> bool {
        self.infos.iter().any(|info| info.is_input == is_input)
    }
}

/// ASIO driver running on an `AudioBackend`: one input and one output
/// device, chosen by name at `init`, exposed as a single ASIO device.
pub struct BackendDriver {
    backend: Rc<dyn AudioBackend>,
    config: HarnessConfig,
    devices: Option<SelectedDevices>,
    sample_rate: f64,
    buffers: Option<Buffers>,
    active: Option<ActiveStream>,
    stream: Option<Stream>,
    last_error: String,
    /// Last, so stream teardown on drop is still redirected.
    _logger: Option<BackendLogger>,
}

impl BackendDriver {
    /// `backend_debug` keeps the backend's debug output redirected into the
    /// log for as long as the driver lives.
    pub fn new(backend: Rc<dyn AudioBackend>, config: HarnessConfig, backend_debug: bool) -> Self {
        let logger = backend_debug.then(|| BackendLogger::new(backend.as_ref()));
        Self {
            backend,
            config,
            devices: None,
            sample_rate: 0.0,
            buffers: None,
            active: None,
            stream: None,
            last_error: String::new(),
            _logger: logger,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    fn devices(&self) -> AsioResult<&SelectedDevices> {
        self.devices.as_ref().ok_or(AsioError::NOT_PRESENT)
    }

    fn stream_parameters(&self, is_input: bool) -> AsioResult<Option<StreamParameters>> {
        let devices = self.devices()?;
        let (device, channel_count) = if is_input {
            (devices.input.as_ref(), devices.input_channels())
        } else {
            (devices.output.as_ref(), devices.output_channels())
        };
        Ok(device.filter(|_| channel_count > 0).map(|device| StreamParameters {
            device: device.index,
            channel_count,
            sample_format: sample_format::FLOAT32,
            suggested_latency: if is_input {
                device.info.default_low_input_latency
            } else {
                device.info.default_low_output_latency
            },
            host_api_specific: None,
        }))
    }

    /// Low and high device latency in seconds, the larger of both directions.
    fn latency_bounds(&self) -> AsioResult<(f64, f64)> {
        let devices = self.devices()?;
        let mut low: f64 = 0.0;
        let mut high: f64 = 0.0;
        if let Some(input) = &devices.input {
            low = low.max(input.info.default_low_input_latency);
            high = high.max(input.info.default_high_input_latency);
        }
        if let Some(output) = &devices.output {
            low = low.max(output.info.default_low_output_latency);
            high = high.max(output.info.default_high_output_latency);
        }
        Ok((low, high))
    }

    fn fail(&mut self, error: AsioError, message: String) -> AsioError {
        tracing::error!("{}", message);
        self.last_error = message;
        error
    }

    fn open_and_start(&mut self) -> AsioResult<()> {
        let buffers = self.buffers.as_ref().ok_or(AsioError::INVALID_MODE)?;
        let input = if buffers.has_direction(true) {
            self.stream_parameters(true)?
        } else {
            None
        };
        let output = if buffers.has_direction(false) {
            self.stream_parameters(false)?
        } else {
            None
        };

        let callbacks = Arc::clone(&buffers.callbacks);
        let time_info = buffers.time_info;
        let sample_rate = self.sample_rate;
        let mut index = 0usize;
        let mut sample_position = 0i64;
        let callback = stream_callback(move |ctx| {
            let Ok(mut callbacks) = callbacks.lock() else {
                return;
            };
            if time_info {
                let time = AsioTime {
                    sample_position,
                    system_time: ctx.time_info.current_time,
                    sample_rate,
                };
                callbacks.buffer_switch_time_info(&time, index, true);
            } else {
                callbacks.buffer_switch(index, true);
            }
            sample_position += ctx.frames as i64;
            index ^= 1;
        });

        let stream = match open_stream(
            &self.backend,
            input,
            output,
            self.sample_rate,
            buffers.size as u32,
            stream_flags::NO_FLAG,
            callback,
        ) {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(AsioError::HW_MALFUNCTION, e.to_string())),
        };
        let active = match start_stream(&stream) {
            Ok(active) => active,
            Err(e) => return Err(self.fail(AsioError::HW_MALFUNCTION, e.to_string())),
        };
        self.stream = Some(stream);
        self.active = Some(active);
        Ok(())
    }
}

impl AsioDriver for BackendDriver {
    fn init(&mut self, _sys_ref: usize) -> bool {
        tracing::info!("Initializing {} driver", self.backend.name());
        let manager = DeviceManager::new(Rc::clone(&self.backend));
        let host_api = self.config.host_api.as_deref();

        let input = match manager.get_input_device(&self.config.input_device, host_api) {
            Ok(device) => {
                tracing::info!("Selected input device: {}", device);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("No input device: {}", e);
                None
            }
        };
        let output = match manager.get_output_device(&self.config.output_device, host_api) {
            Ok(device) => {
                tracing::info!("Selected output device: {}", device);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("No output device: {}", e);
                None
            }
        };

        let Some(reference) = output.as_ref().or(input.as_ref()) else {
            self.fail(
                AsioError::NOT_PRESENT,
                "No input or output device available".to_string(),
            );
            return false;
        };
        self.sample_rate = reference.info.default_sample_rate;
        self.devices = Some(SelectedDevices { input, output });
        true
    }

    fn driver_name(&self) -> String {
        format!("FlexDiag ({})", self.backend.name())
    }

    fn driver_version(&self) -> i32 {
        DRIVER_VERSION
    }

    fn error_message(&self) -> String {
        self.last_error.clone()
    }

    fn get_channels(&self) -> AsioResult<(i32, i32)> {
        let devices = self.devices()?;
        Ok((devices.input_channels(), devices.output_channels()))
    }

    fn get_latencies(&self) -> AsioResult<Latencies> {
        let buffers = self.buffers.as_ref().ok_or(AsioError::INVALID_MODE)?;
        let frames = |seconds: f64| (seconds * self.sample_rate).round() as i32;
        let (input, output) = match self.stream.as_ref().map(Stream::info) {
            Some(Ok(info)) => (frames(info.input_latency), frames(info.output_latency)),
            _ => (0, 0),
        };
        Ok(Latencies {
            input: input.max(buffers.size),
            output: output.max(buffers.size),
        })
    }

    fn get_buffer_size(&self) -> AsioResult<BufferSize> {
        let (low, high) = self.latency_bounds()?;
        let min = ((low * self.sample_rate).round() as i32).max(1);
        let max = ((high * self.sample_rate).round() as i32).max(min);
        Ok(BufferSize {
            min,
            max,
            preferred: min,
            granularity: 1,
        })
    }

    fn can_sample_rate(&self, sample_rate: f64) -> AsioResult<()> {
        let input = self.stream_parameters(true)?;
        let output = self.stream_parameters(false)?;
        self.backend
            .is_format_supported(input.as_ref(), output.as_ref(), sample_rate)
            .map_err(|e| {
                tracing::debug!("sample rate {} not supported: {}", sample_rate, e);
                AsioError::NO_CLOCK
            })
    }

    fn get_sample_rate(&self) -> AsioResult<f64> {
        self.devices()?;
        Ok(self.sample_rate)
    }

    fn set_sample_rate(&mut self, sample_rate: f64) -> AsioResult<()> {
        self.can_sample_rate(sample_rate)?;
        if self.is_running() {
            return Err(AsioError::INVALID_MODE);
        }
        if sample_rate != self.sample_rate {
            tracing::info!("Sample rate changed from {} to {}", self.sample_rate, sample_rate);
            self.sample_rate = sample_rate;
        }
        Ok(())
    }

    fn get_channel_info(&self, channel: i32, is_input: bool) -> AsioResult<ChannelInfo> {
        let devices = self.devices()?;
        let count = if is_input {
            devices.input_channels()
        } else {
            devices.output_channels()
        };
        if !(0..count).contains(&channel) {
            return Err(AsioError::INVALID_PARAMETER);
        }
        let sample_type =
            sample_type_from_format(sample_format::FLOAT32).ok_or(AsioError::HW_MALFUNCTION)?;
        let mut names = channel_names(default_channel_mask(count as u16), count as usize);
        let is_active = self.buffers.as_ref().is_some_and(|b| {
            b.infos
                .iter()
                .any(|info| info.is_input == is_input && info.channel_num == channel)
        });
        Ok(ChannelInfo {
            channel,
            is_input,
            is_active,
            channel_group: 0,
            sample_type,
            name: names.swap_remove(channel as usize),
        })
    }

    fn create_buffers(
        &mut self,
        buffer_infos: &mut [BufferInfo],
        buffer_size: i32,
        mut callbacks: Box<dyn AsioCallbacks>,
    ) -> AsioResult<()> {
        let (input_channels, output_channels) = self.get_channels()?;
        if self.buffers.is_some() {
            return Err(AsioError::INVALID_MODE);
        }
        validate_buffer_infos(buffer_infos, input_channels, output_channels)?;
        if !buffer_size_allowed(&self.get_buffer_size()?, buffer_size) {
            return Err(AsioError::INVALID_PARAMETER);
        }
        assign_buffer_ids(buffer_infos);

        let time_info = callbacks.asio_message(message::SELECTOR_SUPPORTED, message::SUPPORTS_TIME_INFO)
            == 1
            && callbacks.asio_message(message::SUPPORTS_TIME_INFO, 0) == 1;
        tracing::info!(
            "Created {} buffers of {} frames (host {} time info)",
            buffer_infos.len(),
            buffer_size,
            if time_info { "supports" } else { "does not support" }
        );
        self.buffers = Some(Buffers {
            infos: buffer_infos.to_vec(),
            size: buffer_size,
            callbacks: Arc::new(Mutex::new(callbacks)),
            time_info,
        });
        Ok(())
    }

    fn dispose_buffers(&mut self) -> AsioResult<()> {
        if self.buffers.is_none() {
            return Err(AsioError::INVALID_MODE);
        }
        self.stop()?;
        self.buffers = None;
        Ok(())
    }

    fn start(&mut self) -> AsioResult<()> {
        if self.buffers.is_none() || self.is_running() {
            return Err(AsioError::INVALID_MODE);
        }
        self.open_and_start()
    }

    fn stop(&mut self) -> AsioResult<()> {
        self.active = None;
        self.stream = None;
        Ok(())
    }

    fn output_ready(&mut self) -> AsioResult<()> {
        Err(AsioError::NOT_PRESENT)
    }
}
