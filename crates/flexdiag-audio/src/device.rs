use std::fmt;
use std::rc::Rc;

use flexdiag_core::pa::{DeviceIndex, DeviceInfo, HostApiIndex, HostApiInfo, NO_DEVICE};
use flexdiag_core::BackendError;
use flexdiag_format::{describe_device, describe_host_api};

use crate::backend::AudioBackend;

#[derive(Debug, Clone, PartialEq)]
pub struct HostApi {
    pub index: HostApiIndex,
    pub info: HostApiInfo,
}

impl HostApi {
    pub fn new(backend: &dyn AudioBackend, index: HostApiIndex) -> Result<Self, BackendError> {
        let info = backend
            .host_api_info(index)
            .ok_or(BackendError::HostApiNotFound(index))?;
        Ok(Self { index, info })
    }
}

impl fmt::Display for HostApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe_host_api(self.index, &self.info))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub index: DeviceIndex,
    pub info: DeviceInfo,
}

impl Device {
    pub fn new(backend: &dyn AudioBackend, index: DeviceIndex) -> Result<Self, BackendError> {
        let info = backend
            .device_info(index)
            .ok_or(BackendError::DeviceNotFound(index))?;
        Ok(Self { index, info })
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe_device(self.index, &self.info))
    }
}

/// Looks up host APIs and devices by name. `default` selects the backend's
/// (or the host API's) default device for that direction.
pub struct DeviceManager {
    backend: Rc<dyn AudioBackend>,
}

impl DeviceManager {
    pub fn new(backend: Rc<dyn AudioBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Rc<dyn AudioBackend> {
        &self.backend
    }

    pub fn host_apis(&self) -> Result<Vec<HostApi>, BackendError> {
        (0..self.backend.host_api_count())
            .map(|index| HostApi::new(self.backend.as_ref(), index))
            .collect()
    }

    pub fn devices(&self) -> Result<Vec<Device>, BackendError> {
        (0..self.backend.device_count())
            .map(|index| Device::new(self.backend.as_ref(), index))
            .collect()
    }

    pub fn find_host_api(&self, name: &str) -> Result<HostApi, BackendError> {
        self.host_apis()?
            .into_iter()
            .find(|h| h.info.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| BackendError::NoMatchingHostApi(name.to_string()))
    }

    pub fn get_input_device(
        &self,
        name: &str,
        host_api: Option<&str>,
    ) -> Result<Device, BackendError> {
        self.get_device(name, host_api, true)
    }

    pub fn get_output_device(
        &self,
        name: &str,
        host_api: Option<&str>,
    ) -> Result<Device, BackendError> {
        self.get_device(name, host_api, false)
    }

    fn get_device(
        &self,
        name: &str,
        host_api: Option<&str>,
        is_input: bool,
    ) -> Result<Device, BackendError> {
        let direction = if is_input { "input" } else { "output" };
        let host_api = host_api.map(|h| self.find_host_api(h)).transpose()?;

        if name == "default" {
            let index = match &host_api {
                Some(h) if is_input => h.info.default_input_device,
                Some(h) => h.info.default_output_device,
                None if is_input => self.backend.default_input_device(),
                None => self.backend.default_output_device(),
            };
            if index == NO_DEVICE {
                return Err(BackendError::NoMatchingDevice(format!(
                    "no default {} device",
                    direction
                )));
            }
            return Device::new(self.backend.as_ref(), index);
        }

        let has_channels = |d: &Device| {
            if is_input {
                d.info.max_input_channels > 0
            } else {
                d.info.max_output_channels > 0
            }
        };
        self.devices()?
            .into_iter()
            .filter(|d| host_api.as_ref().map_or(true, |h| d.info.host_api == h.index))
            .find(|d| d.info.name == name && has_channels(d))
            .ok_or_else(|| BackendError::NoMatchingDevice(format!("{} device '{}'", direction, name)))
    }
}
