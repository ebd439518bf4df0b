//! Integration tests for configuration parsing
//!
//! Tests driver configuration files, including:
//! - Minimal and full documents
//! - Defaults for omitted sections
//! - Save and reload through the filesystem
//! - Invalid configuration handling

use kinect::KinectConfig;
use std::time::Duration;
use tempfile::tempdir;

const MINIMAL_CONFIG: &str = r#"
[session]
log_level = "info"
"#;

const FULL_CONFIG: &str = r#"
[session]
log_level = "debug"
init_before_stream = false
home_angle = -15
libusb_log_level = "warning"

[camera]
command_poll_interval_ms = 2
command_max_tries = 500
response_capacity = 512

[motor]
poll_interval_ms = 20
max_polls = 250
strain_limit = 64
timeout_is_error = false

[depth]
frame_interval_ms = 16
buffer_size = 614400
queue_capacity = 8
bulk_timeout_ms = 250
interface = 0
"#;

mod parsing {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: KinectConfig = toml::from_str(MINIMAL_CONFIG).unwrap();
        config.validate().unwrap();

        assert!(config.session.init_before_stream);
        assert_eq!(config.session.home_angle, 0);
        assert_eq!(config.camera.poll_interval(), Duration::from_millis(5));
        assert_eq!(config.camera.command_max_tries, 10_000);
        assert_eq!(config.motor.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.motor.max_polls, 1000);
        assert_eq!(config.motor.strain_limit, 0x30);
        assert!(config.motor.timeout_is_error);
        assert_eq!(config.depth.frame_interval(), Duration::from_millis(33));
        assert_eq!(config.depth.buffer_size, 500_000);
        assert_eq!(config.depth.queue_capacity, 1000);
        assert_eq!(config.depth.interface, 1);
    }

    #[test]
    fn test_full_config() {
        let config: KinectConfig = toml::from_str(FULL_CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(config.session.log_level, "debug");
        assert!(!config.session.init_before_stream);
        assert_eq!(config.session.home_angle, -15);
        assert_eq!(config.session.libusb_log_level.as_deref(), Some("warning"));
        assert_eq!(config.camera.response_capacity, 512);
        assert_eq!(config.motor.strain_limit, 64);
        assert!(!config.motor.timeout_is_error);
        assert_eq!(config.depth.bulk_timeout(), Duration::from_millis(250));
        assert_eq!(config.depth.interface, 0);
    }

    #[test]
    fn test_malformed_toml() {
        let result: Result<KinectConfig, _> = toml::from_str("[session\nlog_level = ");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type() {
        let result: Result<KinectConfig, _> = toml::from_str("[motor]\nstrain_limit = \"high\"\n");
        assert!(result.is_err());
    }
}

mod validation {
    use super::*;

    #[test]
    fn test_invalid_log_level() {
        let mut config = KinectConfig::default();
        config.session.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_libusb_level() {
        let mut config = KinectConfig::default();
        config.session.libusb_log_level = Some("chatty".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_home_angle_limits() {
        let mut config = KinectConfig::default();
        config.session.home_angle = 90;
        assert!(config.validate().is_ok());
        config.session.home_angle = -91;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_response_capacity_must_hold_header() {
        let mut config = KinectConfig::default();
        config.camera.response_capacity = 4;
        assert!(config.validate().is_err());
    }
}

mod persistence {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kinect.toml");

        let mut config = KinectConfig::default();
        config.session.home_angle = 20;
        config.depth.queue_capacity = 32;
        config.save(&path).unwrap();

        let loaded = KinectConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.session.home_angle, 20);
        assert_eq!(loaded.depth.queue_capacity, 32);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kinect.toml");
        std::fs::write(&path, "[motor]\nmax_polls = 0\n").unwrap();

        let err = KinectConfig::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("max_polls"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(KinectConfig::load(Some(dir.path().join("absent.toml"))).is_err());
    }
}
