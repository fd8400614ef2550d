pub mod backend;
pub mod cpal_backend;
pub mod device;
pub mod logger;
pub mod null_backend;
pub mod stream;

pub use backend::{
    extensible_format, stream_callback, AudioBackend, CallbackContext, OpenStreamRequest,
    StreamCallback, StreamId,
};
pub use cpal_backend::CpalBackend;
pub use device::{Device, DeviceManager, HostApi};
pub use logger::BackendLogger;
pub use null_backend::{NullBackend, NullDevice};
pub use stream::{open_stream, start_stream, ActiveStream, CallbackRecorder, CallbackSnapshot, Stream};

use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a ring buffer split into producer and consumer halves.
pub fn create_ring_buffer<T>(capacity: usize) -> (HeapProd<T>, HeapCons<T>) {
    HeapRb::<T>::new(capacity).split()
}
