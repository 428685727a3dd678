//! Persistent log sink

use tubegate_core::tracing_setup::{LOG_FILE_NAME, init_tracing};

#[test]
fn test_log_file_receives_errors() {
    let temp_dir = tempfile::tempdir().unwrap();
    let logs_dir = temp_dir.path().join("logs");

    let path = tokio_test::assert_ok!(init_tracing(tracing::Level::WARN, Some(&logs_dir)));
    assert_eq!(path, logs_dir.join(LOG_FILE_NAME));

    tracing::error!("upstream exploded while streaming");
    tracing::debug!("too verbose for the file");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("upstream exploded while streaming"));
    assert!(contents.contains("ERROR"));
    assert!(!contents.contains("too verbose for the file"));
}
