//! Driver configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KinectConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub motor: MotorSettings,
    #[serde(default)]
    pub depth: DepthSettings,
}

/// Session-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "SessionSettings::default_log_level")]
    pub log_level: String,
    /// Program the depth registers before the stream thread starts reading
    #[serde(default = "SessionSettings::default_init_before_stream")]
    pub init_before_stream: bool,
    /// Tilt the motor is driven to while opening the session
    #[serde(default)]
    pub home_angle: i16,
    /// libusb verbosity (none, error, warning, info, debug)
    #[serde(default)]
    pub libusb_log_level: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            init_before_stream: Self::default_init_before_stream(),
            home_angle: 0,
            libusb_log_level: None,
        }
    }
}

impl SessionSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_init_before_stream() -> bool {
        true
    }
}

/// Camera command polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Delay before each response poll
    #[serde(default = "CameraSettings::default_poll_interval_ms")]
    pub command_poll_interval_ms: u64,
    /// Polls before a command is declared unanswered
    #[serde(default = "CameraSettings::default_max_tries")]
    pub command_max_tries: u32,
    /// Size of the response buffer in bytes
    #[serde(default = "CameraSettings::default_response_capacity")]
    pub response_capacity: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            command_poll_interval_ms: Self::default_poll_interval_ms(),
            command_max_tries: Self::default_max_tries(),
            response_capacity: Self::default_response_capacity(),
        }
    }
}

impl CameraSettings {
    fn default_poll_interval_ms() -> u64 {
        5
    }

    fn default_max_tries() -> u32 {
        10_000
    }

    fn default_response_capacity() -> usize {
        200
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.command_poll_interval_ms)
    }
}

/// Motor feedback loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorSettings {
    /// Delay before each status sample
    #[serde(default = "MotorSettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Status samples taken before giving up on settling
    #[serde(default = "MotorSettings::default_max_polls")]
    pub max_polls: u32,
    /// Strain readings above this trip the safety cutout
    #[serde(default = "MotorSettings::default_strain_limit")]
    pub strain_limit: u8,
    /// Report `MotorTimeout` when the motor never settles
    #[serde(default = "MotorSettings::default_timeout_is_error")]
    pub timeout_is_error: bool,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
            max_polls: Self::default_max_polls(),
            strain_limit: Self::default_strain_limit(),
            timeout_is_error: Self::default_timeout_is_error(),
        }
    }
}

impl MotorSettings {
    fn default_poll_interval_ms() -> u64 {
        10
    }

    fn default_max_polls() -> u32 {
        1000
    }

    fn default_strain_limit() -> u8 {
        0x30
    }

    fn default_timeout_is_error() -> bool {
        true
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Depth stream thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSettings {
    /// Sleep between bulk reads (one frame at 30 fps)
    #[serde(default = "DepthSettings::default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Bulk read buffer size in bytes
    #[serde(default = "DepthSettings::default_buffer_size")]
    pub buffer_size: usize,
    /// Frame-ready signals kept before new ones are dropped
    #[serde(default = "DepthSettings::default_queue_capacity")]
    pub queue_capacity: usize,
    /// libusb timeout of a single bulk read
    #[serde(default = "DepthSettings::default_bulk_timeout_ms")]
    pub bulk_timeout_ms: u64,
    /// Interface claimed for the depth endpoint
    #[serde(default = "DepthSettings::default_interface")]
    pub interface: u8,
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: Self::default_frame_interval_ms(),
            buffer_size: Self::default_buffer_size(),
            queue_capacity: Self::default_queue_capacity(),
            bulk_timeout_ms: Self::default_bulk_timeout_ms(),
            interface: Self::default_interface(),
        }
    }
}

impl DepthSettings {
    fn default_frame_interval_ms() -> u64 {
        33
    }

    fn default_buffer_size() -> usize {
        500_000
    }

    fn default_queue_capacity() -> usize {
        1000
    }

    fn default_bulk_timeout_ms() -> u64 {
        1000
    }

    fn default_interface() -> u8 {
        protocol::DEPTH_INTERFACE
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_timeout_ms)
    }
}

impl KinectConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/rust-kinect/kinect.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: KinectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("rust-kinect").join("kinect.toml")
        } else {
            PathBuf::from(".config/rust-kinect/kinect.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.session.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.session.log_level,
                valid_levels.join(", ")
            ));
        }

        if let Some(level) = &self.session.libusb_log_level {
            parse_libusb_log_level(level)?;
        }

        if !(-90..=90).contains(&self.session.home_angle) {
            return Err(anyhow!(
                "Invalid home_angle {}, must be within +/-90",
                self.session.home_angle
            ));
        }

        if self.camera.command_max_tries == 0 {
            return Err(anyhow!("camera.command_max_tries must be greater than 0"));
        }
        if self.camera.response_capacity < protocol::ControlHeader::SIZE {
            return Err(anyhow!(
                "camera.response_capacity must hold at least a {}-byte header",
                protocol::ControlHeader::SIZE
            ));
        }

        if self.motor.max_polls == 0 {
            return Err(anyhow!("motor.max_polls must be greater than 0"));
        }
        if self.motor.strain_limit == 0 {
            return Err(anyhow!("motor.strain_limit must be greater than 0"));
        }

        if self.depth.buffer_size == 0 {
            return Err(anyhow!("depth.buffer_size must be greater than 0"));
        }
        if self.depth.queue_capacity == 0 {
            return Err(anyhow!("depth.queue_capacity must be greater than 0"));
        }

        Ok(())
    }
}

/// Parse a libusb verbosity name
pub fn parse_libusb_log_level(level: &str) -> Result<rusb::LogLevel> {
    match level.to_ascii_lowercase().as_str() {
        "none" => Ok(rusb::LogLevel::None),
        "error" => Ok(rusb::LogLevel::Error),
        "warning" | "warn" => Ok(rusb::LogLevel::Warning),
        "info" => Ok(rusb::LogLevel::Info),
        "debug" => Ok(rusb::LogLevel::Debug),
        other => Err(anyhow!(
            "Invalid libusb log level '{}', must be one of: none, error, warning, info, debug",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KinectConfig::default();
        assert_eq!(config.session.log_level, "info");
        assert!(config.session.init_before_stream);
        assert_eq!(config.camera.command_max_tries, 10_000);
        assert_eq!(config.motor.max_polls, 1000);
        assert_eq!(config.motor.strain_limit, 0x30);
        assert_eq!(config.depth.buffer_size, 500_000);
        assert_eq!(config.depth.frame_interval(), Duration::from_millis(33));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = KinectConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: KinectConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.session.log_level, parsed.session.log_level);
        assert_eq!(config.depth.queue_capacity, parsed.depth.queue_capacity);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let parsed: KinectConfig = toml::from_str("").unwrap();
        assert_eq!(parsed.camera.response_capacity, 200);
        assert_eq!(parsed.depth.interface, protocol::DEPTH_INTERFACE);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = KinectConfig::default();
        config.session.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.session.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let mut config = KinectConfig::default();
        config.motor.max_polls = 0;
        assert!(config.validate().is_err());

        let mut config = KinectConfig::default();
        config.depth.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = KinectConfig::default();
        config.camera.response_capacity = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_home_angle() {
        let mut config = KinectConfig::default();
        config.session.home_angle = 91;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_libusb_log_level() {
        assert!(matches!(
            parse_libusb_log_level("Debug"),
            Ok(rusb::LogLevel::Debug)
        ));
        assert!(parse_libusb_log_level("loud").is_err());
    }
}
