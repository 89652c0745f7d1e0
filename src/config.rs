use crate::calibration::CameraCharacteristics;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 100;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TARGET_SIZE: u32 = 416;
pub const DEFAULT_STEP_LENGTH_M: f32 = 0.75;
pub const DEFAULT_MINIMAL_COOLDOWN_SECS: u64 = 6;
pub const DEFAULT_MAXIMAL_COOLDOWN_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub detector: Option<DetectorSection>,
    #[serde(default)]
    pub camera: Option<CameraSection>,
    #[serde(default)]
    pub classes: Option<ClassesSection>,
    #[serde(default)]
    pub navigation: Option<NavigationSection>,
    #[serde(default)]
    pub source: Option<SourceSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorSection {
    /// Minimum class score for a grid cell to produce a proposal (default: 0.4)
    pub confidence_threshold: Option<f32>,
    /// IoU above which a lower-ranked box is suppressed (default: 0.5)
    pub iou_threshold: Option<f32>,
    /// Longest side of the letterboxed network input (default: 416)
    pub target_size: Option<u32>,
}

/// Static camera characteristics used for focal length calibration.
#[derive(Debug, Deserialize, Clone)]
pub struct CameraSection {
    pub focal_length_mm: f32,
    pub sensor_width_mm: f32,
    pub pixel_array_width: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassesSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NavigationSection {
    pub step_length_m: Option<f32>,
    pub minimal_cooldown_secs: Option<u64>,
    pub maximal_cooldown_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSection {
    /// JSON recording of inference frames to replay
    pub replay_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
    /// Delay between processed frames in milliseconds (default: 100)
    pub frame_interval_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

fn non_empty(path: Option<&Path>) -> Option<&Path> {
    let path = path?;
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

impl Config {
    pub fn confidence_threshold(&self) -> f32 {
        self.detector
            .as_ref()
            .and_then(|d| d.confidence_threshold)
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn iou_threshold(&self) -> f32 {
        self.detector
            .as_ref()
            .and_then(|d| d.iou_threshold)
            .unwrap_or(DEFAULT_IOU_THRESHOLD)
    }

    pub fn target_size(&self) -> u32 {
        self.detector
            .as_ref()
            .and_then(|d| d.target_size)
            .unwrap_or(DEFAULT_TARGET_SIZE)
    }

    /// Returns the configured camera characteristics, if a `[camera]` section exists.
    pub fn camera_characteristics(&self) -> Option<CameraCharacteristics> {
        self.camera.as_ref().map(|c| CameraCharacteristics {
            focal_length_mm: c.focal_length_mm,
            sensor_width_mm: c.sensor_width_mm,
            pixel_array_width: c.pixel_array_width,
        })
    }

    pub fn class_table_path(&self) -> Option<&Path> {
        non_empty(self.classes.as_ref()?.path.as_deref())
    }

    pub fn replay_path(&self) -> Option<&Path> {
        non_empty(self.source.as_ref()?.replay_path.as_deref())
    }

    /// Returns the step length in meters (default: 0.75)
    pub fn step_length_m(&self) -> f32 {
        self.navigation
            .as_ref()
            .and_then(|n| n.step_length_m)
            .unwrap_or(DEFAULT_STEP_LENGTH_M)
    }

    pub fn minimal_cooldown(&self) -> Duration {
        let secs = self
            .navigation
            .as_ref()
            .and_then(|n| n.minimal_cooldown_secs)
            .unwrap_or(DEFAULT_MINIMAL_COOLDOWN_SECS);
        Duration::from_secs(secs)
    }

    pub fn maximal_cooldown(&self) -> Duration {
        let secs = self
            .navigation
            .as_ref()
            .and_then(|n| n.maximal_cooldown_secs)
            .unwrap_or(DEFAULT_MAXIMAL_COOLDOWN_SECS);
        Duration::from_secs(secs)
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Returns the delay between frames as Duration (default: 100 ms)
    pub fn frame_interval(&self) -> Duration {
        let millis = self
            .server
            .as_ref()
            .and_then(|s| s.frame_interval_ms)
            .unwrap_or(DEFAULT_FRAME_INTERVAL_MS);
        Duration::from_millis(millis)
    }
}
