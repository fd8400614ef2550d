//! Linear end-to-end exercise of an ASIO driver, printing every call and its
//! result the way an ASIO host sees them.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flexdiag_core::config::HarnessConfig;
use flexdiag_core::{
    AppConfig, AsioError, AsioResult, AsioTime, BufferInfo, BufferSize, ChannelInfo, DriverInfo,
    HarnessError,
};
use flexdiag_format::{asio_error_string, sample_type_string};

use crate::driver_trait::{AsioCallbacks, AsioDriver};
use crate::registry::DriverRegistry;

const ASIO_VERSION: i32 = 2;

/// The step a failed run stopped at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Init,
    GetChannels,
    GetBufferSize,
    SampleRate(f64),
    CreateBuffers,
    Start,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Init => write!(f, "ASIOInit"),
            Step::GetChannels => write!(f, "ASIOGetChannels"),
            Step::GetBufferSize => write!(f, "ASIOGetBufferSize"),
            Step::SampleRate(rate) => write!(f, "sample rate {}", rate),
            Step::CreateBuffers => write!(f, "ASIOCreateBuffers"),
            Step::Start => write!(f, "ASIOStart"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(Step),
}

impl Outcome {
    pub fn passed(&self) -> bool {
        *self == Outcome::Passed
    }
}

/// Host callbacks that only count buffer switches.
struct HarnessCallbacks {
    buffer_switches: Arc<AtomicU64>,
}

impl AsioCallbacks for HarnessCallbacks {
    fn buffer_switch(&mut self, _index: usize, _direct_process: bool) {
        self.buffer_switches.fetch_add(1, Ordering::Relaxed);
    }

    fn sample_rate_did_change(&mut self, sample_rate: f64) {
        tracing::info!("driver reported sample rate change to {}", sample_rate);
    }

    fn asio_message(&mut self, _selector: i32, _value: i32) -> i32 {
        0
    }

    fn buffer_switch_time_info(&mut self, _time: &AsioTime, index: usize, direct_process: bool) {
        self.buffer_switch(index, direct_process);
    }
}

impl HarnessCallbacks {
    /// The four callback entries as handed to `ASIOCreateBuffers`.
    fn describe_entries() -> String {
        format!(
            "bufferSwitch = {:p} sampleRateDidChange = {:p} asioMessage = {:p} bufferSwitchTimeInfo = {:p}",
            <Self as AsioCallbacks>::buffer_switch as fn(&mut Self, usize, bool),
            <Self as AsioCallbacks>::sample_rate_did_change as fn(&mut Self, f64),
            <Self as AsioCallbacks>::asio_message as fn(&mut Self, i32, i32) -> i32,
            <Self as AsioCallbacks>::buffer_switch_time_info
                as fn(&mut Self, &AsioTime, usize, bool),
        )
    }
}

fn asio_bool(value: bool) -> i32 {
    i32::from(value)
}

/// Runs the driver through one full negotiation. Everything the host would see
/// is written to `out`.
pub struct Harness<'a> {
    driver: &'a mut dyn AsioDriver,
    config: &'a HarnessConfig,
    out: &'a mut dyn Write,
}

impl<'a> Harness<'a> {
    pub fn new(
        driver: &'a mut dyn AsioDriver,
        config: &'a HarnessConfig,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            driver,
            config,
            out,
        }
    }

    fn print_error<T>(&mut self, result: &AsioResult<T>) -> Result<AsioError, HarnessError> {
        let code = match result {
            Ok(_) => AsioError::OK,
            Err(e) => *e,
        };
        writeln!(self.out, "-> {}", asio_error_string(code))?;
        Ok(code)
    }

    fn init(&mut self) -> Result<Option<DriverInfo>, HarnessError> {
        let mut info = DriverInfo {
            asio_version: ASIO_VERSION,
            ..DriverInfo::default()
        };
        writeln!(self.out, "ASIOInit(asioVersion = {})", info.asio_version)?;
        let result = if self.driver.init(info.sys_ref) {
            Ok(())
        } else {
            Err(AsioError::NOT_PRESENT)
        };
        info.driver_version = self.driver.driver_version();
        info.name = self.driver.driver_name();
        info.error_message = self.driver.error_message();
        let code = self.print_error(&result)?;
        writeln!(
            self.out,
            "asioVersion = {} driverVersion = {} name = {} errorMessage = {} sysRef = {}",
            info.asio_version, info.driver_version, info.name, info.error_message, info.sys_ref
        )?;
        Ok(code.is_ok().then_some(info))
    }

    fn get_channels(&mut self) -> Result<(i32, i32), HarnessError> {
        writeln!(self.out, "ASIOGetChannels()")?;
        let result = self.driver.get_channels();
        self.print_error(&result)?;
        let Ok((inputs, outputs)) = result else {
            return Ok((0, 0));
        };
        writeln!(self.out, "Channel count: {} input, {} output", inputs, outputs)?;
        Ok((inputs, outputs))
    }

    fn get_buffer_size(&mut self) -> Result<Option<BufferSize>, HarnessError> {
        writeln!(self.out, "ASIOGetBufferSize()")?;
        let result = self.driver.get_buffer_size();
        self.print_error(&result)?;
        let Ok(size) = result else {
            return Ok(None);
        };
        writeln!(
            self.out,
            "Buffer size: min {} max {} preferred {} granularity {}",
            size.min, size.max, size.preferred, size.granularity
        )?;
        Ok(Some(size))
    }

    fn get_sample_rate(&mut self) -> Result<Option<f64>, HarnessError> {
        writeln!(self.out, "ASIOGetSampleRate()")?;
        let result = self.driver.get_sample_rate();
        self.print_error(&result)?;
        let Ok(rate) = result else {
            return Ok(None);
        };
        writeln!(self.out, "Sample rate: {}", rate)?;
        Ok(Some(rate))
    }

    fn can_sample_rate(&mut self, rate: f64) -> Result<bool, HarnessError> {
        writeln!(self.out, "ASIOCanSampleRate({})", rate)?;
        let result = self.driver.can_sample_rate(rate);
        Ok(self.print_error(&result)?.is_ok())
    }

    fn set_sample_rate(&mut self, rate: f64) -> Result<bool, HarnessError> {
        writeln!(self.out, "ASIOSetSampleRate({})", rate)?;
        let result = self.driver.set_sample_rate(rate);
        Ok(self.print_error(&result)?.is_ok())
    }

    /// Can, set, then read back. Stops at the first failing call.
    fn negotiate_sample_rate(&mut self, rate: f64) -> Result<bool, HarnessError> {
        Ok(self.can_sample_rate(rate)?
            && self.set_sample_rate(rate)?
            && self.get_sample_rate()? == Some(rate))
    }

    fn output_ready(&mut self) -> Result<bool, HarnessError> {
        writeln!(self.out, "ASIOOutputReady()")?;
        let result = self.driver.output_ready();
        Ok(self.print_error(&result)?.is_ok())
    }

    fn get_channel_info(
        &mut self,
        channel: i32,
        is_input: bool,
    ) -> Result<Option<ChannelInfo>, HarnessError> {
        writeln!(
            self.out,
            "ASIOGetChannelInfo(channel = {} isInput = {})",
            channel,
            asio_bool(is_input)
        )?;
        let result = self.driver.get_channel_info(channel, is_input);
        self.print_error(&result)?;
        let Ok(info) = result else {
            return Ok(None);
        };
        writeln!(
            self.out,
            "isActive = {} channelGroup = {} type = {} name = {}",
            asio_bool(info.is_active),
            info.channel_group,
            sample_type_string(info.sample_type),
            info.name
        )?;
        Ok(Some(info))
    }

    fn get_all_channel_info(&mut self, channels: (i32, i32)) -> Result<(), HarnessError> {
        for channel in 0..channels.0 {
            self.get_channel_info(channel, true)?;
        }
        for channel in 0..channels.1 {
            self.get_channel_info(channel, false)?;
        }
        Ok(())
    }

    fn get_latencies(&mut self) -> Result<(), HarnessError> {
        writeln!(self.out, "ASIOGetLatencies()")?;
        let result = self.driver.get_latencies();
        self.print_error(&result)?;
        if let Ok(latencies) = result {
            writeln!(
                self.out,
                "Latencies: input {} output {}",
                latencies.input, latencies.output
            )?;
        }
        Ok(())
    }

    fn create_buffers(
        &mut self,
        channels: (i32, i32),
        buffer_size: i32,
        callbacks: HarnessCallbacks,
    ) -> Result<Vec<BufferInfo>, HarnessError> {
        let inputs = self.config.input_channels.map_or(channels.0, |n| n.min(channels.0));
        let outputs = self.config.output_channels.map_or(channels.1, |n| n.min(channels.1));
        let mut buffer_infos: Vec<BufferInfo> = (0..inputs)
            .map(|channel| BufferInfo::new(true, channel))
            .chain((0..outputs).map(|channel| BufferInfo::new(false, channel)))
            .collect();

        write!(self.out, "ASIOCreateBuffers(")?;
        for info in &buffer_infos {
            write!(
                self.out,
                "isInput = {} channelNum = {} ",
                asio_bool(info.is_input),
                info.channel_num
            )?;
        }
        writeln!(
            self.out,
            ", bufferSize = {}, {})",
            buffer_size,
            HarnessCallbacks::describe_entries()
        )?;

        let result = self
            .driver
            .create_buffers(&mut buffer_infos, buffer_size, Box::new(callbacks));
        if !self.print_error(&result)?.is_ok() {
            return Ok(Vec::new());
        }
        Ok(buffer_infos)
    }

    fn report(&mut self, name: &str, result: AsioResult<()>) -> Result<bool, HarnessError> {
        writeln!(self.out, "{}()", name)?;
        Ok(self.print_error(&result)?.is_ok())
    }

    pub async fn run(&mut self) -> Result<Outcome, HarnessError> {
        if self.init()?.is_none() {
            return Ok(Outcome::Failed(Step::Init));
        }
        writeln!(self.out)?;

        let channels = self.get_channels()?;
        if channels == (0, 0) {
            return Ok(Outcome::Failed(Step::GetChannels));
        }
        writeln!(self.out)?;

        let Some(buffer_size) = self.get_buffer_size()? else {
            return Ok(Outcome::Failed(Step::GetBufferSize));
        };
        writeln!(self.out)?;

        self.get_sample_rate()?;
        writeln!(self.out)?;

        let rates = self.config.sample_rates.clone();
        for rate in rates {
            if !self.negotiate_sample_rate(rate)? && rate == self.config.required_sample_rate {
                return Ok(Outcome::Failed(Step::SampleRate(rate)));
            }
        }
        writeln!(self.out)?;

        self.output_ready()?;
        writeln!(self.out)?;

        self.get_all_channel_info(channels)?;
        writeln!(self.out)?;

        let buffer_switches = Arc::new(AtomicU64::new(0));
        let callbacks = HarnessCallbacks {
            buffer_switches: Arc::clone(&buffer_switches),
        };
        let size = self.config.buffer_size.unwrap_or(buffer_size.preferred);
        let buffers = self.create_buffers(channels, size, callbacks)?;
        if buffers.is_empty() {
            return Ok(Outcome::Failed(Step::CreateBuffers));
        }
        writeln!(self.out)?;

        self.get_sample_rate()?;
        self.get_latencies()?;
        self.get_all_channel_info(channels)?;
        writeln!(self.out)?;

        let result = self.driver.start();
        if !self.report("ASIOStart", result)? {
            let result = self.driver.dispose_buffers();
            self.report("ASIODisposeBuffers", result)?;
            return Ok(Outcome::Failed(Step::Start));
        }
        tokio::time::sleep(Duration::from_millis(self.config.run_millis)).await;
        writeln!(
            self.out,
            "Buffer switches: {}",
            buffer_switches.load(Ordering::Relaxed)
        )?;
        let result = self.driver.stop();
        self.report("ASIOStop", result)?;
        let result = self.driver.dispose_buffers();
        self.report("ASIODisposeBuffers", result)?;

        Ok(Outcome::Passed)
    }
}

/// Creates the configured driver, runs the harness on it, then drops it.
pub async fn init_and_run(
    registry: &DriverRegistry,
    config: &AppConfig,
    out: &mut dyn Write,
) -> Result<Outcome, HarnessError> {
    let mut driver = registry.create(&config.harness.driver, config)?;
    tracing::info!("Running harness on driver '{}'", config.harness.driver);
    let outcome = Harness::new(driver.as_mut(), &config.harness, out).run().await?;
    match outcome {
        Outcome::Passed => tracing::info!("Harness passed"),
        Outcome::Failed(step) => tracing::error!("Harness failed at {}", step),
    }
    Ok(outcome)
}
