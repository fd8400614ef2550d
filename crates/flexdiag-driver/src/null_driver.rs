use std::cell::Cell;

use flexdiag_core::{
    AsioError, AsioResult, BufferInfo, BufferSize, ChannelInfo, Latencies, SampleType,
};
use flexdiag_format::{channel_names, default_channel_mask};

use crate::driver_trait::{
    assign_buffer_ids, buffer_size_allowed, validate_buffer_infos, AsioCallbacks, AsioDriver,
};

const CHANNELS: i32 = 2;
const SAMPLE_RATES: [f64; 3] = [44100.0, 48000.0, 96000.0];
const BUFFER_SIZE: BufferSize = BufferSize {
    min: 64,
    max: 4096,
    preferred: 512,
    granularity: -1,
};

struct NullBuffers {
    infos: Vec<BufferInfo>,
    size: i32,
    callbacks: Box<dyn AsioCallbacks>,
}

/// Driver without audio: two inputs, two outputs, power-of-two buffers. A
/// started driver delivers one buffer switch synchronously, as a priming
/// period, and nothing after that.
pub struct NullDriver {
    initialized: bool,
    sample_rate: f64,
    buffers: Option<NullBuffers>,
    running: bool,
    call_count: Cell<usize>,
}

impl NullDriver {
    pub fn new() -> Self {
        Self {
            initialized: false,
            sample_rate: 48000.0,
            buffers: None,
            running: false,
            call_count: Cell::new(0),
        }
    }

    /// Driver calls made so far, `init` included.
    pub fn call_count(&self) -> usize {
        self.call_count.get()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn enter(&self) -> AsioResult<()> {
        self.call_count.set(self.call_count.get() + 1);
        if self.initialized {
            Ok(())
        } else {
            Err(AsioError::NOT_PRESENT)
        }
    }
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AsioDriver for NullDriver {
    fn init(&mut self, _sys_ref: usize) -> bool {
        self.call_count.set(self.call_count.get() + 1);
        self.initialized = true;
        tracing::debug!("null driver initialized");
        true
    }

    fn driver_name(&self) -> String {
        "Null ASIO".to_string()
    }

    fn driver_version(&self) -> i32 {
        1
    }

    fn error_message(&self) -> String {
        String::new()
    }

    fn get_channels(&self) -> AsioResult<(i32, i32)> {
        self.enter()?;
        Ok((CHANNELS, CHANNELS))
    }

    fn get_latencies(&self) -> AsioResult<Latencies> {
        self.enter()?;
        let buffers = self.buffers.as_ref().ok_or(AsioError::INVALID_MODE)?;
        Ok(Latencies {
            input: buffers.size,
            output: buffers.size,
        })
    }

    fn get_buffer_size(&self) -> AsioResult<BufferSize> {
        self.enter()?;
        Ok(BUFFER_SIZE)
    }

    fn can_sample_rate(&self, sample_rate: f64) -> AsioResult<()> {
        self.enter()?;
        if SAMPLE_RATES.contains(&sample_rate) {
            Ok(())
        } else {
            Err(AsioError::NO_CLOCK)
        }
    }

    fn get_sample_rate(&self) -> AsioResult<f64> {
        self.enter()?;
        Ok(self.sample_rate)
    }

    fn set_sample_rate(&mut self, sample_rate: f64) -> AsioResult<()> {
        self.can_sample_rate(sample_rate)?;
        if self.running {
            return Err(AsioError::INVALID_MODE);
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    fn get_channel_info(&self, channel: i32, is_input: bool) -> AsioResult<ChannelInfo> {
        self.enter()?;
        if !(0..CHANNELS).contains(&channel) {
            return Err(AsioError::INVALID_PARAMETER);
        }
        let is_active = self.buffers.as_ref().is_some_and(|b| {
            b.infos
                .iter()
                .any(|info| info.is_input == is_input && info.channel_num == channel)
        });
        let names = channel_names(default_channel_mask(CHANNELS as u16), CHANNELS as usize);
        Ok(ChannelInfo {
            channel,
            is_input,
            is_active,
            channel_group: 0,
            sample_type: SampleType::FLOAT32_LSB,
            name: names[channel as usize].clone(),
        })
    }

    fn create_buffers(
        &mut self,
        buffer_infos: &mut [BufferInfo],
        buffer_size: i32,
        callbacks: Box<dyn AsioCallbacks>,
    ) -> AsioResult<()> {
        self.enter()?;
        if self.buffers.is_some() {
            return Err(AsioError::INVALID_MODE);
        }
        validate_buffer_infos(buffer_infos, CHANNELS, CHANNELS)?;
        if !buffer_size_allowed(&BUFFER_SIZE, buffer_size) {
            return Err(AsioError::INVALID_PARAMETER);
        }
        assign_buffer_ids(buffer_infos);
        self.buffers = Some(NullBuffers {
            infos: buffer_infos.to_vec(),
            size: buffer_size,
            callbacks,
        });
        Ok(())
    }

    fn dispose_buffers(&mut self) -> AsioResult<()> {
        self.enter()?;
        if self.buffers.is_none() {
            return Err(AsioError::INVALID_MODE);
        }
        self.running = false;
        self.buffers = None;
        Ok(())
    }

    fn start(&mut self) -> AsioResult<()> {
        self.enter()?;
        let buffers = self.buffers.as_mut().ok_or(AsioError::INVALID_MODE)?;
        if self.running {
            return Err(AsioError::INVALID_MODE);
        }
        self.running = true;
        buffers.callbacks.buffer_switch(0, true);
        Ok(())
    }

    fn stop(&mut self) -> AsioResult<()> {
        self.enter()?;
        self.running = false;
        Ok(())
    }

    fn output_ready(&mut self) -> AsioResult<()> {
        self.enter()?;
        Err(AsioError::NOT_PRESENT)
    }
}
