use flexdiag_core::{AsioError, AsioResult, AsioTime, BufferInfo, BufferSize, ChannelInfo, Latencies};

/// Host-side callbacks handed to `create_buffers`. Called from the audio
/// thread once the driver is started.
pub trait AsioCallbacks: Send {
    /// `index` is the half of the double buffer that is ready.
    fn buffer_switch(&mut self, index: usize, direct_process: bool);
    fn sample_rate_did_change(&mut self, sample_rate: f64);
    fn asio_message(&mut self, selector: i32, value: i32) -> i32;
    fn buffer_switch_time_info(&mut self, time: &AsioTime, index: usize, direct_process: bool);
}

/// The `IASIO` driver surface.
pub trait AsioDriver {
    /// Returns false when the driver cannot run; `error_message` says why.
    fn init(&mut self, sys_ref: usize) -> bool;
    fn driver_name(&self) -> String;
    fn driver_version(&self) -> i32;
    fn error_message(&self) -> String;

    /// Input and output channel counts.
    fn get_channels(&self) -> AsioResult<(i32, i32)>;
    fn get_latencies(&self) -> AsioResult<Latencies>;
    fn get_buffer_size(&self) -> AsioResult<BufferSize>;
    fn can_sample_rate(&self, sample_rate: f64) -> AsioResult<()>;
    fn get_sample_rate(&self) -> AsioResult<f64>;
    fn set_sample_rate(&mut self, sample_rate: f64) -> AsioResult<()>;
    fn get_channel_info(&self, channel: i32, is_input: bool) -> AsioResult<ChannelInfo>;

    /// Fills in the buffer ids of every entry.
    fn create_buffers(
        &mut self,
        buffer_infos: &mut [BufferInfo],
        buffer_size: i32,
        callbacks: Box<dyn AsioCallbacks>,
    ) -> AsioResult<()>;
    fn dispose_buffers(&mut self) -> AsioResult<()>;
    fn start(&mut self) -> AsioResult<()>;
    fn stop(&mut self) -> AsioResult<()>;
    fn output_ready(&mut self) -> AsioResult<()>;
}

/// Checks shared by drivers: a non-empty list, channels in range, no channel
/// listed twice.
pub(crate) fn validate_buffer_infos(
    buffer_infos: &[BufferInfo],
    input_channels: i32,
    output_channels: i32,
) -> AsioResult<()> {
    if buffer_infos.is_empty() {
        return Err(AsioError::INVALID_PARAMETER);
    }
    for (i, info) in buffer_infos.iter().enumerate() {
        let count = if info.is_input {
            input_channels
        } else {
            output_channels
        };
        if info.channel_num < 0 || info.channel_num >= count {
            return Err(AsioError::INVALID_PARAMETER);
        }
        let duplicate = buffer_infos[..i]
            .iter()
            .any(|other| other.is_input == info.is_input && other.channel_num == info.channel_num);
        if duplicate {
            return Err(AsioError::INVALID_PARAMETER);
        }
    }
    Ok(())
}

/// Gives every entry its two buffer ids, in list order.
pub(crate) fn assign_buffer_ids(buffer_infos: &mut [BufferInfo]) {
    for (i, info) in buffer_infos.iter_mut().enumerate() {
        let base = (i * 2) as u32;
        info.buffers = [Some(base), Some(base + 1)];
    }
}

/// Whether `size` is acceptable under `bounds`.
pub(crate) fn buffer_size_allowed(bounds: &BufferSize, size: i32) -> bool {
    if size < bounds.min || size > bounds.max {
        return false;
    }
    match bounds.granularity {
        -1 => size > 0 && (size & (size - 1)) == 0,
        0 => size == bounds.preferred,
        g => (size - bounds.min) % g == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_and_out_of_range() {
        assert_eq!(validate_buffer_infos(&[], 2, 2), Err(AsioError::INVALID_PARAMETER));
        assert_eq!(
            validate_buffer_infos(&[BufferInfo::new(true, 2)], 2, 2),
            Err(AsioError::INVALID_PARAMETER)
        );
        assert_eq!(
            validate_buffer_infos(&[BufferInfo::new(false, 0)], 2, 0),
            Err(AsioError::INVALID_PARAMETER)
        );
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let infos = [BufferInfo::new(false, 1), BufferInfo::new(false, 1)];
        assert_eq!(validate_buffer_infos(&infos, 2, 2), Err(AsioError::INVALID_PARAMETER));
        let infos = [BufferInfo::new(true, 1), BufferInfo::new(false, 1)];
        assert_eq!(validate_buffer_infos(&infos, 2, 2), Ok(()));
    }

    #[test]
    fn test_assign_buffer_ids() {
        let mut infos = [BufferInfo::new(true, 0), BufferInfo::new(false, 0)];
        assign_buffer_ids(&mut infos);
        assert_eq!(infos[0].buffers, [Some(0), Some(1)]);
        assert_eq!(infos[1].buffers, [Some(2), Some(3)]);
    }

    #[test]
    fn test_buffer_size_allowed() {
        let powers = BufferSize { min: 64, max: 4096, preferred: 512, granularity: -1 };
        assert!(buffer_size_allowed(&powers, 256));
        assert!(!buffer_size_allowed(&powers, 300));
        assert!(!buffer_size_allowed(&powers, 8192));

        let linear = BufferSize { min: 480, max: 1920, preferred: 480, granularity: 1 };
        assert!(buffer_size_allowed(&linear, 481));
        assert!(!buffer_size_allowed(&linear, 479));

        let fixed = BufferSize { min: 480, max: 480, preferred: 480, granularity: 0 };
        assert!(buffer_size_allowed(&fixed, 480));
    }
}
