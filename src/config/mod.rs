//! Application configuration.
//!
//! Configuration is read from a JSON or YAML file, selected by extension,
//! then selectively overridden from `CAMERA_*` environment variables and
//! validated. Validation collects every violation in one pass instead of
//! stopping at the first.
//!
//! ```yaml
//! camera:
//!   ip: 192.168.1.64
//!   username: admin
//!   password: secret
//!   camera_id: front-door
//!   rtsp_path: Streaming/Channels/101
//! logging:
//!   level: info
//!   file: logs/camshot.log
//! output:
//!   directory: output
//!   format: jpg
//! ```

pub mod error;
mod validation;

pub use error::{ConfigError, ConfigViolation};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RTSP_PORT: u16 = 554;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Connection parameters for a single camera.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub rtsp_path: String,
    /// Connection and read timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Retries after a failed connection or capture
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    pub camera_id: String,
}

impl CameraConfig {
    pub fn new(ip: impl Into<String>, camera_id: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: DEFAULT_RTSP_PORT,
            username: String::new(),
            password: String::new(),
            protocol: default_protocol(),
            rtsp_path: String::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            camera_id: camera_id.into(),
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

// Keeps the password out of logs.
impl fmt::Debug for CameraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraConfig")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("protocol", &self.protocol)
            .field("rtsp_path", &self.rtsp_path)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("camera_id", &self.camera_id)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; logs always go to stderr as well
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Encoding used when writing captured frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    #[serde(alias = "jpeg")]
    Jpg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpg => "JPEG",
            Self::Png => "PNG",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            format: ImageFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Everything one invocation needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub camera: CameraConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Pause between retries in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl AppConfig {
    pub fn new(camera: CameraConfig) -> Self {
        Self {
            camera,
            logging: LoggingConfig::default(),
            output: OutputConfig::default(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }

    /// Load, override from the process environment, and validate.
    ///
    /// Returns the configuration together with the names of the
    /// environment variables that were applied.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, Vec<&'static str>), ConfigError> {
        let mut config = Self::from_file(path)?;
        let applied = config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validated().map(|config| (config, applied))
    }

    /// Parse a configuration file without overrides or validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents, format)
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => Ok(serde_json::from_str(contents)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(contents)?),
        }
    }

    /// Apply `CAMERA_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<Vec<&'static str>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(ip) = lookup("CAMERA_IP") {
            self.camera.ip = ip;
            applied.push("CAMERA_IP");
        }
        if let Some(port) = lookup("CAMERA_PORT") {
            self.camera.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "CAMERA_PORT",
                value: port.clone(),
            })?;
            applied.push("CAMERA_PORT");
        }
        if let Some(username) = lookup("CAMERA_USERNAME") {
            self.camera.username = username;
            applied.push("CAMERA_USERNAME");
        }
        if let Some(password) = lookup("CAMERA_PASSWORD") {
            self.camera.password = password;
            applied.push("CAMERA_PASSWORD");
        }
        if let Some(camera_id) = lookup("CAMERA_ID") {
            self.camera.camera_id = camera_id;
            applied.push("CAMERA_ID");
        }

        Ok(applied)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Supported configuration file encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "yml" | "yaml" => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_RTSP_PORT
}

fn default_protocol() -> String {
    "rtsp".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const YAML: &str = r#"
camera:
  ip: 192.168.1.64
  username: admin
  password: secret
  camera_id: cam1
  rtsp_path: stream1
logging:
  level: debug
  file: logs/app.log
"#;

    #[test]
    fn yaml_applies_defaults() {
        let config = AppConfig::parse(YAML, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.camera.ip, "192.168.1.64");
        assert_eq!(config.camera.port, 554);
        assert_eq!(config.camera.protocol, "rtsp");
        assert_eq!(config.camera.timeout, 10);
        assert_eq!(config.camera.retry_count, 3);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn json_file_loads_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"camera": {{"ip": "10.0.0.2", "camera_id": "lobby", "port": 8554}},
                "output": {{"format": "png"}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.camera.port, 8554);
        assert_eq!(config.output.format, ImageFormat::Png);
        assert!(!config.camera.has_credentials());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AppConfig::from_file("/nonexistent/camshot.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
    }

    #[test]
    fn missing_camera_section_fails_to_parse() {
        let err = AppConfig::parse("logging:\n  level: info\n", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = AppConfig::parse(YAML, ConfigFormat::Yaml).unwrap();
        let env: HashMap<&str, &str> = [("CAMERA_IP", "10.1.1.1"), ("CAMERA_PORT", "10554")]
            .into_iter()
            .collect();

        let applied = config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(applied, vec!["CAMERA_IP", "CAMERA_PORT"]);
        assert_eq!(config.camera.ip, "10.1.1.1");
        assert_eq!(config.camera.port, 10554);
        assert_eq!(config.camera.username, "admin");
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = AppConfig::parse(YAML, ConfigFormat::Yaml).unwrap();
        let err = config
            .apply_env_overrides(|key| (key == "CAMERA_PORT").then(|| "http".to_string()))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEnv { var: "CAMERA_PORT", .. }));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = AppConfig::parse(YAML, ConfigFormat::Yaml).unwrap();
        let rendered = format!("{:?}", config.camera);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("admin"));
    }
}
