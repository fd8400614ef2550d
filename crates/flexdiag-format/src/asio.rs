use flexdiag_core::pa::{sample_format, SampleFormat};
use flexdiag_core::{AsioError, SampleType};

pub fn asio_error_string(error: AsioError) -> &'static str {
    match error {
        AsioError::OK => "ASE_OK",
        AsioError::SUCCESS => "ASE_SUCCESS",
        AsioError::NOT_PRESENT => "ASE_NotPresent",
        AsioError::HW_MALFUNCTION => "ASE_HWMalfunction",
        AsioError::INVALID_PARAMETER => "ASE_InvalidParameter",
        AsioError::INVALID_MODE => "ASE_InvalidMode",
        AsioError::SP_NOT_ADVANCING => "ASE_SPNotAdvancing",
        AsioError::NO_CLOCK => "ASE_NoClock",
        AsioError::NO_MEMORY => "ASE_NoMemory",
        _ => "(unknown ASE error code)",
    }
}

pub fn sample_type_string(sample_type: SampleType) -> &'static str {
    match sample_type {
        SampleType::INT16_MSB => "ASIOSTInt16MSB",
        SampleType::INT24_MSB => "ASIOSTInt24MSB",
        SampleType::INT32_MSB => "ASIOSTInt32MSB",
        SampleType::FLOAT32_MSB => "ASIOSTFloat32MSB",
        SampleType::FLOAT64_MSB => "ASIOSTFloat64MSB",
        SampleType::INT32_MSB16 => "ASIOSTInt32MSB16",
        SampleType::INT32_MSB18 => "ASIOSTInt32MSB18",
        SampleType::INT32_MSB20 => "ASIOSTInt32MSB20",
        SampleType::INT32_MSB24 => "ASIOSTInt32MSB24",
        SampleType::INT16_LSB => "ASIOSTInt16LSB",
        SampleType::INT24_LSB => "ASIOSTInt24LSB",
        SampleType::INT32_LSB => "ASIOSTInt32LSB",
        SampleType::FLOAT32_LSB => "ASIOSTFloat32LSB",
        SampleType::FLOAT64_LSB => "ASIOSTFloat64LSB",
        SampleType::INT32_LSB16 => "ASIOSTInt32LSB16",
        SampleType::INT32_LSB18 => "ASIOSTInt32LSB18",
        SampleType::INT32_LSB20 => "ASIOSTInt32LSB20",
        SampleType::INT32_LSB24 => "ASIOSTInt32LSB24",
        SampleType::DSD_INT8_LSB1 => "ASIOSTDSDInt8LSB1",
        SampleType::DSD_INT8_MSB1 => "ASIOSTDSDInt8MSB1",
        SampleType::DSD_INT8_NER8 => "ASIOSTDSDInt8NER8",
        _ => "(unknown ASIO sample type)",
    }
}

/// Little-endian ASIO sample type carrying a backend sample format, ignoring
/// the non-interleaved bit. `None` for formats ASIO has no type for.
pub fn sample_type_from_format(format: SampleFormat) -> Option<SampleType> {
    match format & !sample_format::NON_INTERLEAVED {
        sample_format::FLOAT32 => Some(SampleType::FLOAT32_LSB),
        sample_format::INT32 => Some(SampleType::INT32_LSB),
        sample_format::INT24 => Some(SampleType::INT24_LSB),
        sample_format::INT16 => Some(SampleType::INT16_LSB),
        _ => None,
    }
}
