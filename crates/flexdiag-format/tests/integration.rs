use flexdiag_core::pa::{
    sample_format, stream_category, stream_option, thread_priority, wasapi_flags,
    HostApiSpecificStreamInfo, StreamParameters, WasapiStreamInfo,
};
use flexdiag_core::wave::{format_tag, speaker, sub_format};
use flexdiag_core::{AsioError, SampleType, WaveFormatExtensible};
use flexdiag_format::{
    asio_error_string, channel_names, default_channel_mask, describe_stream_parameters,
    describe_wave_format, sample_type_from_format, sample_type_string,
};

#[test]
fn test_wasapi_exclusive_stream_parameters() {
    let parameters = StreamParameters {
        device: 3,
        channel_count: 2,
        sample_format: sample_format::FLOAT32,
        suggested_latency: 0.02,
        host_api_specific: Some(HostApiSpecificStreamInfo::wasapi(WasapiStreamInfo {
            flags: wasapi_flags::EXCLUSIVE | wasapi_flags::THREAD_PRIORITY,
            channel_mask: speaker::FRONT_LEFT | speaker::FRONT_RIGHT,
            thread_priority: thread_priority::PRO_AUDIO,
            stream_category: stream_category::MEDIA,
            stream_option: stream_option::RAW,
            ..Default::default()
        })),
    };
    assert_eq!(
        describe_stream_parameters(&parameters),
        "PortAudio stream parameters for device index 3, 2 channels, sample format [Float32], \
         suggested latency 0.02s, host API specific: 56 bytes structure, type 13 [WASAPI], \
         version 1, WASAPI specific: flags [Exclusive, ThreadPriority], channel mask \
         [Front Left, Front Right], host processor output 0x0, host processor input 0x0, \
         thread priority 6 [ProAudio], stream category 11 [Media], stream option 1 [Raw]"
    );
}

#[test]
fn test_float_stereo_wave_format() {
    let format = WaveFormatExtensible {
        format_tag: format_tag::EXTENSIBLE,
        channels: 2,
        samples_per_sec: 48000,
        avg_bytes_per_sec: 384_000,
        block_align: 8,
        bits_per_sample: 32,
        valid_bits_per_sample: 32,
        channel_mask: default_channel_mask(2),
        sub_format: sub_format::IEEE_FLOAT,
    };
    assert_eq!(
        describe_wave_format(&format),
        "WAVEFORMAT with format tag 65534 [EXTENSIBLE], 2 channels, 48000 samples/second, \
         384000 average bytes/second, block alignment 8 bytes, 32 bits per sample, \
         32 valid bits per sample, channel mask [Front Left, Front Right], \
         format {00000003-0000-0010-8000-00AA00389B71} [IEEE Float]"
    );
}

#[test]
fn test_channel_names_for_surround_layout() {
    let names = channel_names(default_channel_mask(6), 8);
    assert_eq!(
        names,
        vec![
            "Front Left",
            "Front Right",
            "Front Center",
            "Low Frequency",
            "Back Left",
            "Back Right",
            "Channel 6",
            "Channel 7",
        ]
    );
}

#[test]
fn test_backend_format_to_asio_type_name() {
    let sample_type = sample_type_from_format(sample_format::INT16 | sample_format::NON_INTERLEAVED);
    assert_eq!(sample_type, Some(SampleType::INT16_LSB));
    assert_eq!(sample_type_string(SampleType::INT16_LSB), "ASIOSTInt16LSB");
    assert_eq!(asio_error_string(AsioError::NO_CLOCK), "ASE_NoClock");
}
