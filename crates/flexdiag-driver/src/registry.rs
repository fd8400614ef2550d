use std::collections::HashMap;
use std::rc::Rc;

use flexdiag_audio::{CpalBackend, NullBackend};
use flexdiag_core::{AppConfig, BackendError, HarnessError};

use crate::backend_driver::BackendDriver;
use crate::driver_trait::AsioDriver;
use crate::null_driver::NullDriver;

pub type DriverFactory = fn(&AppConfig) -> Result<Box<dyn AsioDriver>, BackendError>;

pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", |_| Ok(Box::new(NullDriver::new())));
        registry.register("null-backend", |config| {
            Ok(Box::new(BackendDriver::new(
                Rc::new(NullBackend::new()),
                config.harness.clone(),
                config.general.backend_debug,
            )))
        });
        registry.register("cpal", |config| {
            Ok(Box::new(BackendDriver::new(
                Rc::new(CpalBackend::new()?),
                config.harness.clone(),
                config.general.backend_debug,
            )))
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: DriverFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str, config: &AppConfig) -> Result<Box<dyn AsioDriver>, HarnessError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HarnessError::DriverNotFound(name.to_string()))?;
        Ok(factory(config)?)
    }

    pub fn list_drivers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
