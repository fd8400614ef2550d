use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flexdiag_core::pa::{StreamCallbackFlags, StreamCallbackTimeInfo, StreamFlags, StreamInfo, StreamParameters};
use flexdiag_core::BackendError;
use flexdiag_format::{
    describe_stream_callback_time_info, describe_stream_parameters, stream_callback_flags_string,
    stream_flags_string,
};
use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};

use crate::backend::{stream_callback, AudioBackend, OpenStreamRequest, StreamCallback, StreamId};
use crate::create_ring_buffer;

/// Owns an open backend stream and closes it when the last owner goes away.
struct StreamHandle {
    backend: Rc<dyn AudioBackend>,
    id: StreamId,
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        tracing::info!("Closing {} stream {}", self.backend.name(), self.id);
        if let Err(e) = self.backend.close_stream(self.id) {
            tracing::error!("Unable to close {} stream: {}", self.backend.name(), e);
        }
    }
}

/// An open, not necessarily running, stream. Closed on drop.
pub struct Stream {
    handle: Rc<StreamHandle>,
}

impl Stream {
    pub fn id(&self) -> StreamId {
        self.handle.id
    }

    pub fn info(&self) -> Result<StreamInfo, BackendError> {
        self.handle.backend.stream_info(self.handle.id)
    }
}

/// A started stream. Stopped on drop; keeps the stream open until then.
pub struct ActiveStream {
    handle: Rc<StreamHandle>,
}

impl ActiveStream {
    pub fn id(&self) -> StreamId {
        self.handle.id
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        tracing::info!("Stopping {} stream {}", self.handle.backend.name(), self.handle.id);
        if let Err(e) = self.handle.backend.stop_stream(self.handle.id) {
            tracing::error!("Unable to stop {} stream: {}", self.handle.backend.name(), e);
        }
    }
}

fn describe_optional(parameters: Option<&StreamParameters>) -> String {
    parameters.map_or_else(|| "none".to_string(), describe_stream_parameters)
}

pub fn open_stream(
    backend: &Rc<dyn AudioBackend>,
    input: Option<StreamParameters>,
    output: Option<StreamParameters>,
    sample_rate: f64,
    frames_per_buffer: u32,
    flags: StreamFlags,
    callback: StreamCallback,
) -> Result<Stream, BackendError> {
    let name = backend.name();
    tracing::info!("Opening {} stream with...", name);
    tracing::info!("...input parameters: {}", describe_optional(input.as_ref()));
    tracing::info!("...output parameters: {}", describe_optional(output.as_ref()));
    tracing::info!("...sample rate: {} Hz", sample_rate);
    tracing::info!("...frames per buffer: {}", frames_per_buffer);
    tracing::info!("...stream flags: {}", stream_flags_string(flags));
    tracing::info!("...stream callback: {:p}", &*callback);
    tracing::info!("...user data: captured by the stream callback");

    let request = OpenStreamRequest {
        input,
        output,
        sample_rate,
        frames_per_buffer,
        flags,
    };
    let id = backend.open_stream(&request, callback)?;
    tracing::info!("{} stream opened: {}", name, id);
    Ok(Stream {
        handle: Rc::new(StreamHandle {
            backend: Rc::clone(backend),
            id,
        }),
    })
}

pub fn start_stream(stream: &Stream) -> Result<ActiveStream, BackendError> {
    let backend = &stream.handle.backend;
    tracing::info!("Starting {} stream {}", backend.name(), stream.id());
    backend.start_stream(stream.id())?;
    tracing::info!("{} stream started", backend.name());
    Ok(ActiveStream {
        handle: Rc::clone(&stream.handle),
    })
}

/// What one callback invocation saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallbackSnapshot {
    pub frames: usize,
    pub time_info: StreamCallbackTimeInfo,
    pub flags: StreamCallbackFlags,
}

impl CallbackSnapshot {
    pub fn describe(&self) -> String {
        format!(
            "{} frames, flags {}, {}",
            self.frames,
            stream_callback_flags_string(self.flags),
            describe_stream_callback_time_info(&self.time_info)
        )
    }
}

/// Reading side of a recording stream callback. The callback pushes into a
/// fixed ring buffer and never allocates; snapshots that do not fit are
/// counted and dropped.
pub struct CallbackRecorder {
    consumer: HeapCons<CallbackSnapshot>,
    dropped: Arc<AtomicU64>,
}

impl CallbackRecorder {
    pub fn new(capacity: usize) -> (Self, StreamCallback) {
        let (mut producer, consumer): (HeapProd<CallbackSnapshot>, _) =
            create_ring_buffer(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_in_callback = Arc::clone(&dropped);

        let callback = stream_callback(move |ctx| {
            let snapshot = CallbackSnapshot {
                frames: ctx.frames,
                time_info: ctx.time_info,
                flags: ctx.flags,
            };
            if producer.try_push(snapshot).is_err() {
                dropped_in_callback.fetch_add(1, Ordering::Relaxed);
            }
        });
        (Self { consumer, dropped }, callback)
    }

    pub fn drain(&mut self) -> Vec<CallbackSnapshot> {
        self.consumer.pop_iter().collect()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_backend::NullBackend;
    use flexdiag_core::pa::{sample_format, stream_flags};

    fn output_parameters() -> StreamParameters {
        StreamParameters {
            device: 1,
            channel_count: 2,
            sample_format: sample_format::FLOAT32,
            suggested_latency: 0.01,
            host_api_specific: None,
        }
    }

    fn null_backend() -> (Rc<NullBackend>, Rc<dyn AudioBackend>) {
        let null = Rc::new(NullBackend::new());
        let backend: Rc<dyn AudioBackend> = null.clone();
        (null, backend)
    }

    fn capture<F: FnOnce()>(f: F) -> Vec<String> {
        use std::collections::VecDeque;
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::layer::SubscriberExt;

        let buffer = Arc::new(Mutex::new(VecDeque::new()));
        let layer = flexdiag_core::TranscriptLayer::new(Arc::clone(&buffer), 100);
        let subscriber = tracing_subscriber::Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        let lines = buffer.lock().unwrap().iter().cloned().collect();
        lines
    }

    #[test]
    fn test_open_logs_every_argument() {
        let (_null, backend) = null_backend();
        let lines = capture(|| {
            let _stream = open_stream(
                &backend,
                None,
                Some(output_parameters()),
                48000.0,
                480,
                stream_flags::NO_FLAG,
                stream_callback(|_| {}),
            )
            .unwrap();
        });
        let position = |needle: &str| {
            lines
                .iter()
                .position(|l| l.contains(needle))
                .unwrap_or_else(|| panic!("no line with {:?} in {:?}", needle, lines))
        };
        let flags = position("...stream flags: ");
        let callback = position("...stream callback: 0x");
        let user_data = position("...user data: ");
        let opened = position("null stream opened: 1");
        assert!(flags < callback && callback < user_data && user_data < opened);
        assert!(lines[0].contains("Opening null stream with..."));
        assert!(lines.iter().any(|l| l.contains("...sample rate: 48000 Hz")));
        assert!(lines.iter().any(|l| l.contains("...frames per buffer: 480")));
    }

    #[test]
    fn test_stream_closes_on_drop() {
        let (null, backend) = null_backend();
        let stream = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            48000.0,
            480,
            stream_flags::NO_FLAG,
            stream_callback(|_| {}),
        )
        .unwrap();
        assert_eq!(null.open_stream_count(), 1);
        drop(stream);
        assert_eq!(null.open_stream_count(), 0);
        assert_eq!(null.calls(), vec!["open 1", "close 1"]);
    }

    #[test]
    fn test_active_stream_stops_before_close() {
        let (null, backend) = null_backend();
        let stream = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            48000.0,
            0,
            stream_flags::NO_FLAG,
            stream_callback(|_| {}),
        )
        .unwrap();
        let active = start_stream(&stream).unwrap();
        assert!(null.is_running(stream.id()));
        // Dropping the stream first must not close a running stream.
        drop(stream);
        assert_eq!(null.open_stream_count(), 1);
        drop(active);
        assert_eq!(null.calls(), vec!["open 1", "start 1", "stop 1", "close 1"]);
    }

    #[test]
    fn test_open_failure_is_reported() {
        let (null, backend) = null_backend();
        null.set_fail_open(true);
        let result = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            48000.0,
            0,
            stream_flags::NO_FLAG,
            stream_callback(|_| {}),
        );
        assert!(matches!(result, Err(BackendError::StreamOpen(_))));
        assert!(null.calls().is_empty());
    }

    #[test]
    fn test_start_failure_leaves_stream_open() {
        let (null, backend) = null_backend();
        null.set_fail_start(true);
        let stream = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            48000.0,
            0,
            stream_flags::NO_FLAG,
            stream_callback(|_| {}),
        )
        .unwrap();
        assert!(matches!(start_stream(&stream), Err(BackendError::StreamStart(_))));
        drop(stream);
        assert_eq!(null.calls(), vec!["open 1", "close 1"]);
    }

    #[test]
    fn test_stream_info_reports_rate() {
        let (_null, backend) = null_backend();
        let stream = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            96000.0,
            0,
            stream_flags::NO_FLAG,
            stream_callback(|_| {}),
        )
        .unwrap();
        let info = stream.info().unwrap();
        assert_eq!(info.sample_rate, 96000.0);
        assert_eq!(info.output_latency, 0.01);
        assert_eq!(info.input_latency, 0.0);
    }

    #[test]
    fn test_recorder_captures_callbacks() {
        let (null, backend) = null_backend();
        let (mut recorder, callback) = CallbackRecorder::new(16);
        let stream = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            48000.0,
            480,
            stream_flags::NO_FLAG,
            callback,
        )
        .unwrap();
        let _active = start_stream(&stream).unwrap();
        null.fire_callback(stream.id()).unwrap();
        null.fire_callback(stream.id()).unwrap();

        let snapshots = recorder.drain();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].frames, 480);
        assert_eq!(snapshots[0].time_info.current_time, 0.0);
        assert_eq!(snapshots[1].time_info.current_time, 0.01);
        assert!(recorder.drain().is_empty());
        assert_eq!(recorder.dropped(), 0);
    }

    #[test]
    fn test_recorder_counts_overflow() {
        let (null, backend) = null_backend();
        let (mut recorder, callback) = CallbackRecorder::new(2);
        let stream = open_stream(
            &backend,
            None,
            Some(output_parameters()),
            48000.0,
            0,
            stream_flags::NO_FLAG,
            callback,
        )
        .unwrap();
        let _active = start_stream(&stream).unwrap();
        for _ in 0..5 {
            null.fire_callback(stream.id()).unwrap();
        }
        assert_eq!(recorder.drain().len(), 2);
        assert_eq!(recorder.dropped(), 3);
    }

    #[test]
    fn test_snapshot_describe() {
        let snapshot = CallbackSnapshot {
            frames: 256,
            time_info: StreamCallbackTimeInfo::default(),
            flags: 0,
        };
        assert_eq!(
            snapshot.describe(),
            format!(
                "256 frames, flags [], {}",
                describe_stream_callback_time_info(&StreamCallbackTimeInfo::default())
            )
        );
    }
}
