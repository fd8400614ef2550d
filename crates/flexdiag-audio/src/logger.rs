use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::backend::AudioBackend;

static LOGGER_REFERENCE_COUNT: Mutex<usize> = Mutex::new(0);
static REDIRECT_ENABLED: AtomicBool = AtomicBool::new(false);

/// Keeps backend debug output redirected into the log while at least one
/// guard is alive.
pub struct BackendLogger {
    name: String,
}

impl BackendLogger {
    pub fn new(backend: &dyn AudioBackend) -> Self {
        tracing::info!("{} version: {}", backend.name(), backend.version_text());

        let name = backend.name().to_string();
        let mut count = LOGGER_REFERENCE_COUNT
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *count += 1;
        if *count == 1 {
            tracing::info!("Enabling {} debug output redirection", name);
            REDIRECT_ENABLED.store(true, Ordering::Release);
        }
        Self { name }
    }
}

impl Drop for BackendLogger {
    fn drop(&mut self) {
        let mut count = LOGGER_REFERENCE_COUNT
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *count -= 1;
        if *count == 0 {
            tracing::info!("Disabling {} debug output redirection", self.name);
            REDIRECT_ENABLED.store(false, Ordering::Release);
        }
    }
}

pub fn is_redirect_enabled() -> bool {
    REDIRECT_ENABLED.load(Ordering::Acquire)
}

/// Entry point for a backend's own debug output. Returns whether the line was
/// redirected; it is discarded otherwise.
pub fn debug_print(source: &str, line: &str) -> bool {
    if !is_redirect_enabled() {
        return false;
    }
    tracing::debug!(target: "flexdiag::backend", "[{}] {}", source, line.trim_end());
    true
}

#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());
