//! Human-readable renderings of ASIO, PortAudio and wave format values.

pub mod asio;
pub mod portaudio;
pub mod string;
pub mod wave;

pub use asio::{asio_error_string, sample_type_from_format, sample_type_string};
pub use portaudio::{
    describe_device, describe_host_api, describe_stream_callback_time_info,
    describe_stream_info, describe_stream_parameters, host_api_type_id_string,
    sample_format_string, stream_callback_flags_string, stream_flags_string,
};
pub use string::{bitfield_to_string, enum_to_string, enum_to_string_with, find_by_name, join};
pub use wave::{channel_names, default_channel_mask, describe_wave_format, guid_string};
