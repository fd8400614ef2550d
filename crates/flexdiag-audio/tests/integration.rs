use std::rc::Rc;

use flexdiag_audio::{
    open_stream, start_stream, AudioBackend, CallbackRecorder, DeviceManager, NullBackend,
};
use flexdiag_core::pa::{sample_format, stream_flags, StreamParameters};

fn parameters(device: i32, channel_count: i32) -> StreamParameters {
    StreamParameters {
        device,
        channel_count,
        sample_format: sample_format::FLOAT32,
        suggested_latency: 0.02,
        host_api_specific: None,
    }
}

#[test]
fn test_duplex_stream_lifecycle_through_device_manager() {
    let null = Rc::new(NullBackend::new());
    let backend: Rc<dyn AudioBackend> = null.clone();
    let manager = DeviceManager::new(Rc::clone(&backend));

    let input = manager.get_input_device("default", None).unwrap();
    let output = manager.get_output_device("default", None).unwrap();
    let (mut recorder, callback) = CallbackRecorder::new(64);

    let stream = open_stream(
        manager.backend(),
        Some(parameters(input.index, 2)),
        Some(parameters(output.index, 2)),
        44100.0,
        441,
        stream_flags::CLIP_OFF | stream_flags::DITHER_OFF,
        callback,
    )
    .unwrap();
    let info = stream.info().unwrap();
    assert_eq!(info.input_latency, 0.02);
    assert_eq!(info.output_latency, 0.02);

    {
        let _active = start_stream(&stream).unwrap();
        for _ in 0..3 {
            null.fire_callback(stream.id()).unwrap();
        }
    }
    assert!(!null.is_running(stream.id()));
    assert!(null.fire_callback(stream.id()).is_err());

    let snapshots = recorder.drain();
    assert_eq!(snapshots.len(), 3);
    assert!(snapshots.iter().all(|s| s.frames == 441));
    assert_eq!(snapshots[2].time_info.current_time, 0.02);

    drop(stream);
    assert_eq!(
        null.calls(),
        vec!["open 1", "start 1", "stop 1", "close 1"]
    );
}

#[test]
fn test_unsupported_rate_is_rejected_before_open() {
    let null = Rc::new(NullBackend::new());
    let backend: Rc<dyn AudioBackend> = null.clone();
    let (_recorder, callback) = CallbackRecorder::new(4);
    let result = open_stream(
        &backend,
        None,
        Some(parameters(1, 2)),
        22050.0,
        0,
        stream_flags::NO_FLAG,
        callback,
    );
    assert!(result.is_err());
    assert_eq!(null.open_stream_count(), 0);
}

#[test]
fn test_default_format_of_null_output() {
    let backend = NullBackend::new();
    let format = backend.device_default_format(1).unwrap();
    assert_eq!(format.channels, 2);
    assert_eq!(format.samples_per_sec, 48000);
    assert!(flexdiag_format::describe_wave_format(&format).contains("[IEEE Float]"));
}
