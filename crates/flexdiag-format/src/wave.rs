use std::fmt::Write;

use flexdiag_core::wave::{format_tag, speaker, sub_format};
use flexdiag_core::{Guid, WaveFormatExtensible};

use crate::string::{bitfield_to_string, enum_to_string, enum_to_string_with};

pub const WAVE_FORMAT_TAGS: &[(u16, &str)] = &[
    (format_tag::PCM, "PCM"),
    (format_tag::IEEE_FLOAT, "IEEE_FLOAT"),
    (format_tag::EXTENSIBLE, "EXTENSIBLE"),
    (format_tag::MPEG, "MPEG"),
    (format_tag::MPEGLAYER3, "MPEGLAYER3"),
];

/// In bit order, which is also channel order in an interleaved frame.
pub const SPEAKER_POSITIONS: &[(u32, &str)] = &[
    (speaker::FRONT_LEFT, "Front Left"),
    (speaker::FRONT_RIGHT, "Front Right"),
    (speaker::FRONT_CENTER, "Front Center"),
    (speaker::LOW_FREQUENCY, "Low Frequency"),
    (speaker::BACK_LEFT, "Back Left"),
    (speaker::BACK_RIGHT, "Back Right"),
    (speaker::FRONT_LEFT_OF_CENTER, "Front Left of Center"),
    (speaker::FRONT_RIGHT_OF_CENTER, "Front Right of Center"),
    (speaker::BACK_CENTER, "Back Center"),
    (speaker::SIDE_LEFT, "Side Left"),
    (speaker::SIDE_RIGHT, "Side Right"),
    (speaker::TOP_CENTER, "Top Center"),
    (speaker::TOP_FRONT_LEFT, "Top Front Left"),
    (speaker::TOP_FRONT_CENTER, "Top Front Center"),
    (speaker::TOP_FRONT_RIGHT, "Top Front Right"),
    (speaker::TOP_BACK_LEFT, "Top Back Left"),
    (speaker::TOP_BACK_CENTER, "Top Back Center"),
    (speaker::TOP_BACK_RIGHT, "Top Back Right"),
];

pub const SUB_FORMATS: &[(Guid, &str)] = &[
    (sub_format::ADPCM, "ADPCM"),
    (sub_format::ALAW, "A-law"),
    (sub_format::DRM, "DRM"),
    (
        sub_format::IEC61937_DOLBY_DIGITAL_PLUS,
        "IEC61937 Dolby Digital Plus",
    ),
    (sub_format::IEC61937_DOLBY_DIGITAL, "IEC61937 Dolby Digital"),
    (sub_format::IEEE_FLOAT, "IEEE Float"),
    (sub_format::MPEG, "MPEG-1"),
    (sub_format::MULAW, "Mu-law"),
    (sub_format::PCM, "PCM"),
];

pub fn wave_format_tag_string(tag: u16) -> String {
    enum_to_string(tag, WAVE_FORMAT_TAGS)
}

pub fn wave_format_channel_mask_string(channel_mask: u32) -> String {
    bitfield_to_string(channel_mask, SPEAKER_POSITIONS)
}

/// Registry form, e.g. `{00000001-0000-0010-8000-00AA00389B71}`.
pub fn guid_string(guid: &Guid) -> String {
    let d = &guid.data4;
    format!(
        "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
        guid.data1, guid.data2, guid.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
    )
}

pub fn wave_sub_format_string(sub_format: &Guid) -> String {
    enum_to_string_with(*sub_format, SUB_FORMATS, guid_string)
}

pub fn describe_wave_format(format: &WaveFormatExtensible) -> String {
    let mut result = format!(
        "WAVEFORMAT with format tag {}, {} channels, {} samples/second, {} average bytes/second, block alignment {} bytes, {} bits per sample",
        wave_format_tag_string(format.format_tag),
        format.channels,
        format.samples_per_sec,
        format.avg_bytes_per_sec,
        format.block_align,
        format.bits_per_sample,
    );

    if format.format_tag == format_tag::EXTENSIBLE {
        let _ = write!(
            result,
            ", {} valid bits per sample, channel mask {}, format {}",
            format.valid_bits_per_sample,
            wave_format_channel_mask_string(format.channel_mask),
            wave_sub_format_string(&format.sub_format),
        );
    }

    result
}

/// `KSAUDIO_SPEAKER_*` layout for common channel counts; 0 (no mask) otherwise.
pub fn default_channel_mask(channels: u16) -> u32 {
    use speaker::*;
    match channels {
        1 => FRONT_CENTER,
        2 => FRONT_LEFT | FRONT_RIGHT,
        4 => FRONT_LEFT | FRONT_RIGHT | BACK_LEFT | BACK_RIGHT,
        6 => FRONT_LEFT | FRONT_RIGHT | FRONT_CENTER | LOW_FREQUENCY | BACK_LEFT | BACK_RIGHT,
        8 => {
            FRONT_LEFT
                | FRONT_RIGHT
                | FRONT_CENTER
                | LOW_FREQUENCY
                | BACK_LEFT
                | BACK_RIGHT
                | SIDE_LEFT
                | SIDE_RIGHT
        }
        _ => 0,
    }
}

/// One name per channel: the speaker positions set in `channel_mask`, in
/// order, then `Channel N` for channels the mask does not cover.
pub fn channel_names(channel_mask: u32, count: usize) -> Vec<String> {
    let mut names: Vec<String> = SPEAKER_POSITIONS
        .iter()
        .filter(|(bit, _)| channel_mask & bit != 0)
        .take(count)
        .map(|(_, name)| (*name).to_string())
        .collect();
    for channel in names.len()..count {
        names.push(format!("Channel {}", channel));
    }
    names
}
