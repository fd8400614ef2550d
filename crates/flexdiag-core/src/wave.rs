/// Windows `GUID`, laid out the way `WAVEFORMATEXTENSIBLE::SubFormat` is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

const KSDATAFORMAT_BASE_DATA4: [u8; 8] = [0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71];

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// KSDATAFORMAT sub-type GUID derived from a legacy format tag.
    pub const fn from_format_tag(tag: u16) -> Self {
        Self::new(tag as u32, 0x0000, 0x0010, KSDATAFORMAT_BASE_DATA4)
    }
}

pub mod format_tag {
    pub const PCM: u16 = 0x0001;
    pub const IEEE_FLOAT: u16 = 0x0003;
    pub const MPEG: u16 = 0x0050;
    pub const MPEGLAYER3: u16 = 0x0055;
    pub const EXTENSIBLE: u16 = 0xFFFE;
}

pub mod speaker {
    pub const FRONT_LEFT: u32 = 0x1;
    pub const FRONT_RIGHT: u32 = 0x2;
    pub const FRONT_CENTER: u32 = 0x4;
    pub const LOW_FREQUENCY: u32 = 0x8;
    pub const BACK_LEFT: u32 = 0x10;
    pub const BACK_RIGHT: u32 = 0x20;
    pub const FRONT_LEFT_OF_CENTER: u32 = 0x40;
    pub const FRONT_RIGHT_OF_CENTER: u32 = 0x80;
    pub const BACK_CENTER: u32 = 0x100;
    pub const SIDE_LEFT: u32 = 0x200;
    pub const SIDE_RIGHT: u32 = 0x400;
    pub const TOP_CENTER: u32 = 0x800;
    pub const TOP_FRONT_LEFT: u32 = 0x1000;
    pub const TOP_FRONT_CENTER: u32 = 0x2000;
    pub const TOP_FRONT_RIGHT: u32 = 0x4000;
    pub const TOP_BACK_LEFT: u32 = 0x8000;
    pub const TOP_BACK_CENTER: u32 = 0x10000;
    pub const TOP_BACK_RIGHT: u32 = 0x20000;
}

pub mod sub_format {
    use super::Guid;

    pub const PCM: Guid = Guid::from_format_tag(0x0001);
    pub const ADPCM: Guid = Guid::from_format_tag(0x0002);
    pub const IEEE_FLOAT: Guid = Guid::from_format_tag(0x0003);
    pub const ALAW: Guid = Guid::from_format_tag(0x0006);
    pub const MULAW: Guid = Guid::from_format_tag(0x0007);
    pub const DRM: Guid = Guid::from_format_tag(0x0009);
    pub const MPEG: Guid = Guid::from_format_tag(0x0050);
    pub const IEC61937_DOLBY_DIGITAL: Guid = Guid::from_format_tag(0x0092);
    pub const IEC61937_DOLBY_DIGITAL_PLUS: Guid =
        Guid::new(0x0000_000a, 0x0cea, 0x0010, super::KSDATAFORMAT_BASE_DATA4);
}

/// `WAVEFORMATEXTENSIBLE`. The extensible fields are only meaningful when
/// `format_tag` is `format_tag::EXTENSIBLE`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveFormatExtensible {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    pub sub_format: Guid,
}
