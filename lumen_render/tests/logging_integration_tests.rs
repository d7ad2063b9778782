//! Integration tests for the logging system
//!
//! These tests go through the public `lumen::log` API and the exported
//! `engine_*` macros. No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use lumen_render::lumen::log::{self, LogEntry, LogSeverity, Logger};
use lumen_render::lumen::{Error, Result};
use lumen_render::{engine_bail, engine_internal_error, engine_warn};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn install() -> Arc<Mutex<Vec<LogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        log::set_logger(Self { entries: entries.clone() });
        entries
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn find_texture(key: &str) -> Result<u32> {
    if key == "tex:grass" {
        return Ok(3);
    }
    engine_bail!("lumen::TextureStore", NotLoaded, "{}", key);
}

// ============================================================================
// LOGGER SLOT
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let entries = TestLogger::install();

    log::log(LogSeverity::Info, "lumen::ShaderStore", "Loaded 'sprite'".to_string());
    log::log(LogSeverity::Warn, "lumen::Material", "Shader 'sprite' has no uniform 'tint'".to_string());

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "lumen::ShaderStore");
    assert_eq!(captured[1].message, "Shader 'sprite' has no uniform 'tint'");
    assert!(captured.iter().all(|entry| entry.file.is_none() && entry.line.is_none()));
    drop(captured);

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let entries = TestLogger::install();

    log::log_detailed(LogSeverity::Error, "lumen::Mesh", "upload failed".to_string(), "mesh.rs", 42);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].file, Some("mesh.rs"));
    assert_eq!(captured[0].line, Some(42));
    drop(captured);

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let entries = TestLogger::install();
    log::log(LogSeverity::Info, "test", "Message 1".to_string());

    log::reset_logger();
    log::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_integration_severities_are_ordered() {
    let entries = TestLogger::install();

    for severity in [LogSeverity::Trace, LogSeverity::Debug, LogSeverity::Info, LogSeverity::Warn, LogSeverity::Error] {
        log::log(severity, "test", format!("{:?}", severity));
    }

    let captured = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = captured.iter().map(|entry| entry.severity).collect();
    assert_eq!(severities.len(), 5);
    assert!(severities.windows(2).all(|pair| pair[0] < pair[1]));
    drop(captured);

    log::reset_logger();
}

// ============================================================================
// EXPORTED MACROS
// ============================================================================

#[test]
#[serial]
fn test_integration_bail_logs_and_returns_error() {
    let entries = TestLogger::install();

    assert_eq!(find_texture("tex:grass").unwrap(), 3);
    let err = find_texture("tex:ghost").unwrap_err();

    assert!(matches!(err, Error::NotLoaded(ref key) if key == "tex:ghost"));
    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].source, "lumen::TextureStore");
    assert!(captured[0].file.is_some_and(|file| file.ends_with("logging_integration_tests.rs")));
    drop(captured);

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_internal_error_prefix() {
    let entries = TestLogger::install();

    engine_internal_error!("lumen::RenderState", "transform stack depth {}", 0);
    engine_warn!("lumen::RenderState", "plain warning");

    let captured = entries.lock().unwrap();
    assert_eq!(captured[0].message, "[Internal error] transform stack depth 0");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert_eq!(captured[1].message, "plain warning");
    drop(captured);

    log::reset_logger();
}
