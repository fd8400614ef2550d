use std::rc::Rc;

use flexdiag_audio::{AudioBackend, NullBackend};
use flexdiag_core::config::HarnessConfig;
use flexdiag_core::AppConfig;
use flexdiag_driver::{init_and_run, BackendDriver, DriverRegistry, Harness, Outcome, Step};

fn harness_config() -> HarnessConfig {
    HarnessConfig {
        run_millis: 1,
        ..HarnessConfig::default()
    }
}

#[tokio::test]
async fn test_harness_over_null_backend() {
    let null = Rc::new(NullBackend::new());
    let backend: Rc<dyn AudioBackend> = null.clone();
    let config = harness_config();
    let mut driver = BackendDriver::new(backend, config.clone(), false);

    let mut out = Vec::new();
    let outcome = Harness::new(&mut driver, &config, &mut out).run().await.unwrap();
    let output = String::from_utf8(out).unwrap();

    assert_eq!(outcome, Outcome::Passed);
    assert!(output.contains("name = FlexDiag (null)"));
    assert!(output.contains("Buffer size: min 480 max 1920 preferred 480 granularity 1\n"));
    assert!(output.contains("ASIOCanSampleRate(192000)\n-> ASE_NoClock\n"));
    assert!(output.contains("ASIOSetSampleRate(48000)\n-> ASE_OK\nASIOGetSampleRate()\n-> ASE_OK\nSample rate: 48000\n"));
    // The null backend only runs callbacks on demand.
    assert!(output.contains("Buffer switches: 0\n"));
    assert_eq!(null.calls(), vec!["open 1", "start 1", "stop 1", "close 1"]);
    assert_eq!(null.open_stream_count(), 0);
}

#[tokio::test]
async fn test_harness_fails_when_start_fails() {
    let null = Rc::new(NullBackend::new());
    null.set_fail_start(true);
    let backend: Rc<dyn AudioBackend> = null.clone();
    let config = harness_config();
    let mut driver = BackendDriver::new(backend, config.clone(), false);

    let mut out = Vec::new();
    let outcome = Harness::new(&mut driver, &config, &mut out).run().await.unwrap();
    let output = String::from_utf8(out).unwrap();

    assert_eq!(outcome, Outcome::Failed(Step::Start));
    assert!(output.contains("ASIOStart()\n-> ASE_HWMalfunction\n"));
    assert!(output.ends_with("ASIODisposeBuffers()\n-> ASE_OK\n"));
}

#[tokio::test]
async fn test_harness_fails_without_devices() {
    let backend: Rc<dyn AudioBackend> = Rc::new(NullBackend::with_devices(vec![], vec![]));
    let config = harness_config();
    let mut driver = BackendDriver::new(backend, config.clone(), false);

    let mut out = Vec::new();
    let outcome = Harness::new(&mut driver, &config, &mut out).run().await.unwrap();
    let output = String::from_utf8(out).unwrap();

    assert_eq!(outcome, Outcome::Failed(Step::Init));
    assert!(output.contains("-> ASE_NotPresent\n"));
    assert!(output.contains("errorMessage = No input or output device available"));
}

#[tokio::test]
async fn test_init_and_run_through_registry() {
    let mut config = AppConfig::default();
    config.harness = harness_config();
    config.harness.driver = "null".to_string();
    let mut out = Vec::new();
    let outcome = init_and_run(&DriverRegistry::new(), &config, &mut out)
        .await
        .unwrap();
    assert!(outcome.passed());
    assert!(!out.is_empty());
}
