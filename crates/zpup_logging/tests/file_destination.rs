use std::fs;

use log::LevelFilter;
use tempfile::TempDir;
use zpup_logging::{initialize, zpup_info, LogDestination};

#[test]
fn file_destination_writes_and_second_init_is_rejected() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("zpup.log");

    assert!(initialize(
        LogDestination::File(log_path.clone()),
        LevelFilter::Info
    ));
    zpup_info!("hello from the uploader");
    log::logger().flush();

    let content = fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("hello from the uploader"));

    // A global logger can only be installed once per process.
    assert!(!initialize(LogDestination::Terminal, LevelFilter::Info));
}
