use std::fmt::Write;

use flexdiag_core::pa::{
    callback_flags, host_api_type, sample_format, stream_category, stream_flags, stream_option,
    thread_priority, wasapi_flags, DeviceIndex, DeviceInfo, HostApiIndex, HostApiInfo,
    HostApiTypeId, SampleFormat, StreamCallbackFlags, StreamCallbackTimeInfo, StreamCategory,
    StreamFlags, StreamInfo, StreamOption, StreamParameters, ThreadPriority, WasapiFlags,
};

use crate::string::{bitfield_to_string, enum_to_string};
use crate::wave::wave_format_channel_mask_string;

pub const HOST_API_TYPES: &[(HostApiTypeId, &str)] = &[
    (host_api_type::IN_DEVELOPMENT, "In development"),
    (host_api_type::DIRECT_SOUND, "DirectSound"),
    (host_api_type::MME, "MME"),
    (host_api_type::ASIO, "ASIO"),
    (host_api_type::SOUND_MANAGER, "SoundManager"),
    (host_api_type::CORE_AUDIO, "CoreAudio"),
    (host_api_type::OSS, "OSS"),
    (host_api_type::ALSA, "ALSA"),
    (host_api_type::AL, "AL"),
    (host_api_type::BE_OS, "BeOS"),
    (host_api_type::WDMKS, "WDMKS"),
    (host_api_type::JACK, "JACK"),
    (host_api_type::WASAPI, "WASAPI"),
    (host_api_type::AUDIO_SCIENCE_HPI, "AudioScienceHPI"),
];

pub const SAMPLE_FORMATS: &[(SampleFormat, &str)] = &[
    (sample_format::FLOAT32, "Float32"),
    (sample_format::INT32, "Int32"),
    (sample_format::INT24, "Int24"),
    (sample_format::INT16, "Int16"),
    (sample_format::INT8, "Int8"),
    (sample_format::UINT8, "UInt8"),
    (sample_format::CUSTOM_FORMAT, "CustomFormat"),
    (sample_format::NON_INTERLEAVED, "NonInterleaved"),
];

pub const STREAM_FLAGS: &[(StreamFlags, &str)] = &[
    (stream_flags::CLIP_OFF, "ClipOff"),
    (stream_flags::DITHER_OFF, "DitherOff"),
    (stream_flags::NEVER_DROP_INPUT, "NeverDropInput"),
    (
        stream_flags::PRIME_OUTPUT_BUFFERS_USING_STREAM_CALLBACK,
        "PrimeOutputBuffersUsingStreamCallback",
    ),
];

pub const WASAPI_FLAGS: &[(WasapiFlags, &str)] = &[
    (wasapi_flags::EXCLUSIVE, "Exclusive"),
    (wasapi_flags::REDIRECT_HOST_PROCESSOR, "RedirectHostProcessor"),
    (wasapi_flags::USE_CHANNEL_MASK, "UseChannelMask"),
    (wasapi_flags::POLLING, "Polling"),
    (wasapi_flags::THREAD_PRIORITY, "ThreadPriority"),
];

pub const THREAD_PRIORITIES: &[(ThreadPriority, &str)] = &[
    (thread_priority::NONE, "None"),
    (thread_priority::AUDIO, "Audio"),
    (thread_priority::CAPTURE, "Capture"),
    (thread_priority::DISTRIBUTION, "Distribution"),
    (thread_priority::GAMES, "Games"),
    (thread_priority::PLAYBACK, "Playback"),
    (thread_priority::PRO_AUDIO, "ProAudio"),
    (thread_priority::WINDOW_MANAGER, "WindowManager"),
];

pub const STREAM_CATEGORIES: &[(StreamCategory, &str)] = &[
    (stream_category::OTHER, "Other"),
    (stream_category::COMMUNICATIONS, "Communications"),
    (stream_category::ALERTS, "Alerts"),
    (stream_category::SOUND_EFFECTS, "SoundEffects"),
    (stream_category::GAME_EFFECTS, "GameEffects"),
    (stream_category::GAME_MEDIA, "GameMedia"),
    (stream_category::GAME_CHAT, "GameChat"),
    (stream_category::SPEECH, "Speech"),
    (stream_category::MOVIE, "Movie"),
    (stream_category::MEDIA, "Media"),
];

pub const STREAM_OPTIONS: &[(StreamOption, &str)] = &[
    (stream_option::NONE, "None"),
    (stream_option::RAW, "Raw"),
    (stream_option::MATCH_FORMAT, "MatchFormat"),
];

pub const STREAM_CALLBACK_FLAGS: &[(StreamCallbackFlags, &str)] = &[
    (callback_flags::INPUT_UNDERFLOW, "InputUnderflow"),
    (callback_flags::INPUT_OVERFLOW, "InputOverflow"),
    (callback_flags::OUTPUT_UNDERFLOW, "OutputUnderflow"),
    (callback_flags::OUTPUT_OVERFLOW, "OutputOverflow"),
    (callback_flags::PRIMING_OUTPUT, "PrimingOutput"),
];

pub fn host_api_type_id_string(type_id: HostApiTypeId) -> String {
    enum_to_string(type_id, HOST_API_TYPES)
}

pub fn sample_format_string(format: SampleFormat) -> String {
    bitfield_to_string(format, SAMPLE_FORMATS)
}

pub fn stream_flags_string(flags: StreamFlags) -> String {
    bitfield_to_string(flags, STREAM_FLAGS)
}

pub fn wasapi_flags_string(flags: WasapiFlags) -> String {
    bitfield_to_string(flags, WASAPI_FLAGS)
}

pub fn wasapi_thread_priority_string(priority: ThreadPriority) -> String {
    enum_to_string(priority, THREAD_PRIORITIES)
}

pub fn wasapi_stream_category_string(category: StreamCategory) -> String {
    enum_to_string(category, STREAM_CATEGORIES)
}

pub fn wasapi_stream_option_string(option: StreamOption) -> String {
    enum_to_string(option, STREAM_OPTIONS)
}

pub fn stream_callback_flags_string(flags: StreamCallbackFlags) -> String {
    bitfield_to_string(flags, STREAM_CALLBACK_FLAGS)
}

pub fn describe_host_api(index: HostApiIndex, info: &HostApiInfo) -> String {
    format!(
        "PortAudio host API index {} (name: '{}', type: {}, default input device: {}, default output device: {})",
        index,
        info.name,
        host_api_type_id_string(info.type_id),
        info.default_input_device,
        info.default_output_device,
    )
}

pub fn describe_device(index: DeviceIndex, info: &DeviceInfo) -> String {
    format!(
        "PortAudio device index {} (name: '{}', host API: {}, default sample rate: {}, max input channels: {}, max output channels: {}, input latency: {} (low) {} (high), output latency: {} (low) {} (high))",
        index,
        info.name,
        info.host_api,
        info.default_sample_rate,
        info.max_input_channels,
        info.max_output_channels,
        info.default_low_input_latency,
        info.default_high_input_latency,
        info.default_low_output_latency,
        info.default_high_output_latency,
    )
}

pub fn describe_stream_parameters(parameters: &StreamParameters) -> String {
    let mut result = format!(
        "PortAudio stream parameters for device index {}, {} channels, sample format {}, suggested latency {}s",
        parameters.device,
        parameters.channel_count,
        sample_format_string(parameters.sample_format),
        parameters.suggested_latency,
    );

    if let Some(specific) = &parameters.host_api_specific {
        let _ = write!(
            result,
            ", host API specific: {} bytes structure, type {}, version {}",
            specific.size,
            host_api_type_id_string(specific.host_api_type),
            specific.version,
        );
        if specific.host_api_type == host_api_type::WASAPI {
            if let Some(wasapi) = &specific.wasapi {
                let _ = write!(
                    result,
                    ", WASAPI specific: flags {}, channel mask {}, host processor output {:#x}, host processor input {:#x}, thread priority {}, stream category {}, stream option {}",
                    wasapi_flags_string(wasapi.flags),
                    wave_format_channel_mask_string(wasapi.channel_mask),
                    wasapi.host_processor_output,
                    wasapi.host_processor_input,
                    wasapi_thread_priority_string(wasapi.thread_priority),
                    wasapi_stream_category_string(wasapi.stream_category),
                    wasapi_stream_option_string(wasapi.stream_option),
                );
            }
        }
    }

    result
}

pub fn describe_stream_info(info: &StreamInfo) -> String {
    format!(
        "PortAudio stream info version {}, input latency {}s, output latency {}s, sample rate {} Hz",
        info.struct_version, info.input_latency, info.output_latency, info.sample_rate,
    )
}

pub fn describe_stream_callback_time_info(time_info: &StreamCallbackTimeInfo) -> String {
    format!(
        "PortAudio stream callback time info with input buffer ADC time {}, current time {}, output buffer DAC time {}",
        time_info.input_buffer_adc_time, time_info.current_time, time_info.output_buffer_dac_time,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexdiag_core::pa::{HostApiSpecificStreamInfo, WasapiStreamInfo, NO_DEVICE};
    use flexdiag_core::wave::speaker;

    #[test]
    fn test_host_api_type_strings() {
        assert_eq!(host_api_type_id_string(host_api_type::WASAPI), "13 [WASAPI]");
        assert_eq!(host_api_type_id_string(host_api_type::IN_DEVELOPMENT), "0 [In development]");
        // 6 was never assigned
        assert_eq!(host_api_type_id_string(6), "6");
    }

    #[test]
    fn test_sample_format_string() {
        assert_eq!(sample_format_string(sample_format::FLOAT32), "[Float32]");
        assert_eq!(
            sample_format_string(sample_format::INT16 | sample_format::NON_INTERLEAVED),
            "[Int16, NonInterleaved]"
        );
    }

    #[test]
    fn test_stream_flags_string() {
        assert_eq!(stream_flags_string(stream_flags::NO_FLAG), "[]");
        assert_eq!(
            stream_flags_string(stream_flags::CLIP_OFF | stream_flags::DITHER_OFF),
            "[ClipOff, DitherOff]"
        );
    }

    #[test]
    fn test_wasapi_enum_strings() {
        assert_eq!(wasapi_thread_priority_string(thread_priority::PRO_AUDIO), "6 [ProAudio]");
        assert_eq!(wasapi_stream_category_string(stream_category::MEDIA), "11 [Media]");
        assert_eq!(wasapi_stream_category_string(1), "1");
        assert_eq!(wasapi_stream_option_string(stream_option::RAW), "1 [Raw]");
    }

    #[test]
    fn test_callback_flags_string() {
        assert_eq!(
            stream_callback_flags_string(
                callback_flags::OUTPUT_UNDERFLOW | callback_flags::PRIMING_OUTPUT
            ),
            "[OutputUnderflow, PrimingOutput]"
        );
    }

    #[test]
    fn test_describe_host_api() {
        let info = HostApiInfo {
            type_id: host_api_type::WASAPI,
            name: "Windows WASAPI".to_string(),
            device_count: 4,
            default_input_device: 2,
            default_output_device: NO_DEVICE,
        };
        assert_eq!(
            describe_host_api(1, &info),
            "PortAudio host API index 1 (name: 'Windows WASAPI', type: 13 [WASAPI], default input device: 2, default output device: -1)"
        );
    }

    #[test]
    fn test_describe_device() {
        let info = DeviceInfo {
            name: "Speakers".to_string(),
            host_api: 0,
            max_input_channels: 0,
            max_output_channels: 2,
            default_low_input_latency: 0.0,
            default_low_output_latency: 0.01,
            default_high_input_latency: 0.0,
            default_high_output_latency: 0.1,
            default_sample_rate: 48000.0,
        };
        assert_eq!(
            describe_device(3, &info),
            "PortAudio device index 3 (name: 'Speakers', host API: 0, default sample rate: 48000, max input channels: 0, max output channels: 2, input latency: 0 (low) 0 (high), output latency: 0.01 (low) 0.1 (high))"
        );
    }

    #[test]
    fn test_describe_stream_parameters_plain() {
        let params = StreamParameters {
            device: 5,
            channel_count: 2,
            sample_format: sample_format::FLOAT32,
            suggested_latency: 0.02,
            host_api_specific: None,
        };
        assert_eq!(
            describe_stream_parameters(&params),
            "PortAudio stream parameters for device index 5, 2 channels, sample format [Float32], suggested latency 0.02s"
        );
    }

    #[test]
    fn test_describe_stream_parameters_wasapi() {
        let params = StreamParameters {
            device: 1,
            channel_count: 2,
            sample_format: sample_format::INT16,
            suggested_latency: 0.01,
            host_api_specific: Some(HostApiSpecificStreamInfo::wasapi(WasapiStreamInfo {
                flags: wasapi_flags::EXCLUSIVE | wasapi_flags::USE_CHANNEL_MASK,
                channel_mask: speaker::FRONT_LEFT | speaker::FRONT_RIGHT,
                thread_priority: thread_priority::PRO_AUDIO,
                stream_category: stream_category::MEDIA,
                stream_option: stream_option::RAW,
                ..WasapiStreamInfo::default()
            })),
        };
        let description = describe_stream_parameters(&params);
        assert!(description.contains(
            ", host API specific: 56 bytes structure, type 13 [WASAPI], version 1"
        ));
        assert!(description.contains(
            ", WASAPI specific: flags [Exclusive, UseChannelMask], channel mask [Front Left, Front Right], host processor output 0x0, host processor input 0x0, thread priority 6 [ProAudio], stream category 11 [Media], stream option 1 [Raw]"
        ));
    }

    #[test]
    fn test_describe_stream_parameters_other_host_api_has_no_wasapi_section() {
        let params = StreamParameters {
            device: 1,
            channel_count: 1,
            sample_format: sample_format::FLOAT32,
            suggested_latency: 0.01,
            host_api_specific: Some(HostApiSpecificStreamInfo {
                size: 24,
                host_api_type: host_api_type::ASIO,
                version: 1,
                wasapi: None,
            }),
        };
        let description = describe_stream_parameters(&params);
        assert!(description.ends_with("24 bytes structure, type 3 [ASIO], version 1"));
        assert!(!description.contains("WASAPI specific"));
    }

    #[test]
    fn test_describe_stream_info() {
        let info = StreamInfo {
            struct_version: 1,
            input_latency: 0.0,
            output_latency: 0.015,
            sample_rate: 44100.0,
        };
        assert_eq!(
            describe_stream_info(&info),
            "PortAudio stream info version 1, input latency 0s, output latency 0.015s, sample rate 44100 Hz"
        );
    }

    #[test]
    fn test_describe_callback_time_info() {
        let time_info = StreamCallbackTimeInfo {
            input_buffer_adc_time: 0.0,
            current_time: 1.5,
            output_buffer_dac_time: 1.52,
        };
        assert_eq!(
            describe_stream_callback_time_info(&time_info),
            "PortAudio stream callback time info with input buffer ADC time 0, current time 1.5, output buffer DAC time 1.52"
        );
    }
}
