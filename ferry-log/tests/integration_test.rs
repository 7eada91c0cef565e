//! Integration tests for ferry-log

use ferry_log::{Format, Level, LogConfig, LogError, init};

// Installing a global subscriber can happen once per process, so every
// scenario lives in this single test.
#[test]
fn test_init_writes_json_file_and_refuses_second_install() {
    let temp_dir = tempfile::tempdir().unwrap();
    let log_dir = temp_dir.path().join("logs");

    let config = LogConfig::new()
        .with_level(Level::Debug)
        .with_format(Format::Json)
        .with_log_dir(&log_dir);
    let guard = init(&config).unwrap();
    assert_eq!(guard.log_file(), Some(log_dir.join("app.log").as_path()));

    tracing::info!(upload_id = "u-1", percentage = 50, "Upload progress");
    tracing::trace!("below the configured level");

    let second = init(&LogConfig::new());
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));

    drop(guard);

    let contents = std::fs::read_to_string(log_dir.join("app.log")).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("Upload progress"))
        .unwrap();
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["upload_id"], "u-1");
    assert_eq!(event["percentage"], 50);
    assert!(!contents.contains("below the configured level"));
}
