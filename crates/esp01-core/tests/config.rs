use esp01_core::config::DeviceConfig;
use esp01_core::protocol::{LineEnding, ProtocolError, RunnerConfig};
use pretty_assertions::assert_eq;

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("esp01.json");

    let config = DeviceConfig {
        port_name: "/dev/ttyUSB1".to_string(),
        baud_rate: 9600,
        timeout_ms: 2500,
        native_line_ending: true,
        runner: RunnerConfig {
            max_frame_len: 128,
            max_response_len: 4096,
            line_ending: LineEnding::CrLf,
            trace: true,
        },
    };
    config.save(&path).unwrap();

    let loaded = DeviceConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_line_ending_is_lowercase_in_json() {
    let config = DeviceConfig::from_json_str(r#"{"runner": {"line_ending": "crlf"}}"#).unwrap();
    assert_eq!(config.runner.line_ending, LineEnding::CrLf);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = DeviceConfig::from_file(dir.path().join("nope.json"));
    assert!(matches!(result, Err(ProtocolError::IoError(_))));
}

#[test]
fn test_invalid_json() {
    assert!(matches!(
        DeviceConfig::from_json_str("{ not json"),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_rejects_tiny_limits() {
    let json = r#"{"runner": {"max_response_len": 1}}"#;
    assert!(matches!(
        DeviceConfig::from_json_str(json),
        Err(ProtocolError::ConfigError(_))
    ));
}
