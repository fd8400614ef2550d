use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flexdiag_audio::{
    open_stream, start_stream, AudioBackend, BackendLogger, CallbackRecorder, CpalBackend, Device,
    DeviceManager, NullBackend,
};
use flexdiag_core::config::{StreamConfig, WasapiConfig};
use flexdiag_core::pa::{
    sample_format, stream_flags, wasapi_flags, HostApiSpecificStreamInfo, StreamFlags,
    StreamParameters, WasapiStreamInfo,
};
use flexdiag_core::ConfigError;
use flexdiag_format::portaudio::{STREAM_CATEGORIES, STREAM_OPTIONS, THREAD_PRIORITIES};
use flexdiag_format::{describe_stream_info, describe_wave_format, find_by_name};

const RECORDER_CAPACITY: usize = 4096;
const DRAIN_INTERVAL: Duration = Duration::from_millis(250);

pub fn create_backend(name: &str) -> Result<Rc<dyn AudioBackend>> {
    match name {
        "cpal" => {
            let backend = CpalBackend::new().context("failed to initialize cpal backend")?;
            Ok(Rc::new(backend))
        }
        "null" => Ok(Rc::new(NullBackend::new())),
        other => bail!("unknown backend '{}' (available: cpal, null)", other),
    }
}

/// Prints every host API and device the backend knows about, each device
/// followed by its default format.
pub fn list(backend: &Rc<dyn AudioBackend>, out: &mut dyn Write) -> Result<()> {
    let manager = DeviceManager::new(Rc::clone(backend));
    for host_api in manager.host_apis()? {
        writeln!(out, "{}", host_api)?;
    }
    for device in manager.devices()? {
        writeln!(out, "{}", device)?;
        match backend.device_default_format(device.index) {
            Ok(format) => writeln!(out, "  default format: {}", describe_wave_format(&format))?,
            Err(e) => writeln!(out, "  default format unavailable: {}", e)?,
        }
    }
    Ok(())
}

fn lookup<T: Copy>(
    kind: &'static str,
    name: Option<&str>,
    table: &[(T, &str)],
) -> Result<Option<T>, ConfigError> {
    name.map(|name| {
        find_by_name(name, table).ok_or_else(|| ConfigError::UnknownName {
            kind,
            name: name.to_string(),
        })
    })
    .transpose()
}

pub fn wasapi_stream_info(config: &WasapiConfig) -> Result<WasapiStreamInfo, ConfigError> {
    let mut info = WasapiStreamInfo::default();
    if config.exclusive {
        info.flags |= wasapi_flags::EXCLUSIVE;
    }
    if config.polling {
        info.flags |= wasapi_flags::POLLING;
    }
    if let Some(priority) =
        lookup("thread priority", config.thread_priority.as_deref(), THREAD_PRIORITIES)?
    {
        info.flags |= wasapi_flags::THREAD_PRIORITY;
        info.thread_priority = priority;
    }
    if let Some(category) =
        lookup("stream category", config.stream_category.as_deref(), STREAM_CATEGORIES)?
    {
        info.stream_category = category;
    }
    if let Some(option) = lookup("stream option", config.stream_option.as_deref(), STREAM_OPTIONS)? {
        info.stream_option = option;
    }
    Ok(info)
}

pub fn stream_flags_for(config: &StreamConfig) -> StreamFlags {
    let mut flags = stream_flags::NO_FLAG;
    if config.clip_off {
        flags |= stream_flags::CLIP_OFF;
    }
    if config.dither_off {
        flags |= stream_flags::DITHER_OFF;
    }
    flags
}

pub fn stream_parameters(
    config: &StreamConfig,
    device: &Device,
    is_input: bool,
) -> Result<StreamParameters, ConfigError> {
    let low_latency = if is_input {
        device.info.default_low_input_latency
    } else {
        device.info.default_low_output_latency
    };
    let host_api_specific = config
        .wasapi
        .as_ref()
        .map(wasapi_stream_info)
        .transpose()?
        .map(HostApiSpecificStreamInfo::wasapi);
    Ok(StreamParameters {
        device: device.index,
        channel_count: config.channels,
        sample_format: sample_format::FLOAT32,
        suggested_latency: config.suggested_latency.unwrap_or(low_latency),
        host_api_specific,
    })
}

/// Totals of a `stream` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub callbacks: u64,
    pub dropped: u64,
}

/// Opens and runs a stream for `duration`, logging each callback, until the
/// time is up or the user interrupts.
pub async fn stream(
    backend: &Rc<dyn AudioBackend>,
    config: &StreamConfig,
    duration: Duration,
) -> Result<StreamSummary> {
    let manager = DeviceManager::new(Rc::clone(backend));
    let host_api = config.host_api.as_deref();

    let input = match config.input_device.as_deref() {
        Some(name) => {
            let device = manager.get_input_device(name, host_api)?;
            tracing::info!("Using input device: {}", device);
            Some(stream_parameters(config, &device, true)?)
        }
        None => None,
    };
    let output = match config.output_device.as_deref() {
        Some(name) => {
            let device = manager.get_output_device(name, host_api)?;
            tracing::info!("Using output device: {}", device);
            Some(stream_parameters(config, &device, false)?)
        }
        None => None,
    };
    if input.is_none() && output.is_none() {
        bail!("neither an input nor an output device is configured");
    }

    let (mut recorder, callback) = CallbackRecorder::new(RECORDER_CAPACITY);
    let stream = open_stream(
        backend,
        input,
        output,
        config.sample_rate,
        config.frames_per_buffer,
        stream_flags_for(config),
        callback,
    )?;
    tracing::info!("Stream info: {}", describe_stream_info(&stream.info()?));

    let mut summary = StreamSummary::default();
    let mut log_snapshots = |recorder: &mut CallbackRecorder| {
        for snapshot in recorder.drain() {
            summary.callbacks += 1;
            tracing::debug!("Callback {}: {}", summary.callbacks, snapshot.describe());
        }
    };

    {
        let _active = start_stream(&stream)?;
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ticker = tokio::time::interval(DRAIN_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = &mut ctrl_c => {
                    tracing::info!("interrupted, stopping stream");
                    break;
                }
                _ = ticker.tick() => log_snapshots(&mut recorder),
            }
        }
    }
    drop(stream);

    log_snapshots(&mut recorder);
    summary.dropped = recorder.dropped();
    tracing::info!(
        "{} callbacks recorded, {} dropped",
        summary.callbacks,
        summary.dropped
    );
    Ok(summary)
}

/// Turns on backend debug redirection for the lifetime of the returned guard.
pub fn backend_logger(backend: &Rc<dyn AudioBackend>, enabled: bool) -> Option<BackendLogger> {
    enabled.then(|| BackendLogger::new(backend.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexdiag_core::pa::{stream_category, stream_option, thread_priority};

    fn null_backend() -> Rc<dyn AudioBackend> {
        create_backend("null").unwrap()
    }

    #[test]
    fn test_create_backend_unknown() {
        let err = create_backend("jack").err().unwrap();
        assert!(err.to_string().contains("unknown backend 'jack'"));
    }

    #[test]
    fn test_list_null_backend() {
        let backend = null_backend();
        let mut out = Vec::new();
        list(&backend, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("'Null Input'"));
        assert!(text.contains("'Null Output'"));
        assert_eq!(text.matches("default format").count(), 2);
    }

    #[test]
    fn test_wasapi_stream_info_from_config() {
        let config = WasapiConfig {
            exclusive: true,
            polling: false,
            thread_priority: Some("proaudio".to_string()),
            stream_category: Some("Media".to_string()),
            stream_option: Some("Raw".to_string()),
        };
        let info = wasapi_stream_info(&config).unwrap();
        assert_eq!(info.flags, wasapi_flags::EXCLUSIVE | wasapi_flags::THREAD_PRIORITY);
        assert_eq!(info.thread_priority, thread_priority::PRO_AUDIO);
        assert_eq!(info.stream_category, stream_category::MEDIA);
        assert_eq!(info.stream_option, stream_option::RAW);
    }

    #[test]
    fn test_wasapi_stream_info_unknown_name() {
        let config = WasapiConfig {
            stream_option: Some("Loud".to_string()),
            ..Default::default()
        };
        let err = wasapi_stream_info(&config).unwrap_err();
        assert_eq!(err.to_string(), "unknown stream option name: Loud");
    }

    #[test]
    fn test_stream_flags_for() {
        let config = StreamConfig {
            clip_off: true,
            dither_off: true,
            ..Default::default()
        };
        assert_eq!(
            stream_flags_for(&config),
            stream_flags::CLIP_OFF | stream_flags::DITHER_OFF
        );
        assert_eq!(stream_flags_for(&StreamConfig::default()), stream_flags::NO_FLAG);
    }

    #[test]
    fn test_stream_parameters_use_device_latency() {
        let backend = null_backend();
        let device = Device::new(backend.as_ref(), 1).unwrap();
        let config = StreamConfig {
            wasapi: Some(WasapiConfig {
                polling: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let parameters = stream_parameters(&config, &device, false).unwrap();
        assert_eq!(parameters.device, 1);
        assert_eq!(parameters.channel_count, 2);
        assert_eq!(parameters.suggested_latency, device.info.default_low_output_latency);
        let specific = parameters.host_api_specific.unwrap();
        assert_eq!(specific.wasapi.unwrap().flags, wasapi_flags::POLLING);
    }

    #[tokio::test]
    async fn test_stream_runs_until_deadline() {
        let backend = null_backend();
        let summary = stream(&backend, &StreamConfig::default(), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(summary, StreamSummary::default());
    }

    #[tokio::test]
    async fn test_stream_requires_a_device() {
        let backend = null_backend();
        let config = StreamConfig {
            output_device: None,
            ..Default::default()
        };
        let err = stream(&backend, &config, Duration::from_millis(10)).await.unwrap_err();
        assert!(err.to_string().contains("neither an input nor an output"));
    }
}
