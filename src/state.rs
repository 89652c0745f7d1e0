use crate::calibration::Calibration;
use crate::config::{DEFAULT_MAXIMAL_COOLDOWN_SECS, DEFAULT_MINIMAL_COOLDOWN_SECS};
use crate::detection::Rect;
use crate::error::AppError;
use crate::navigation::advisory::AdvisoryStreams;
use crate::navigation::dedup::{self, Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObject {
    pub label: usize,
    /// `None` when the label is outside the class table.
    pub class_name: Option<String>,
    pub confidence: f32,
    pub rect: Rect,
}

/// Everything published for the most recently processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub timestamp: SystemTime,
    pub image_width: u32,
    pub image_height: u32,
    pub objects: Vec<DetectedObject>,
    pub streams: AdvisoryStreams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Ko,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationCooldowns {
    pub minimal: Duration,
    pub maximal: Duration,
}

impl Default for NavigationCooldowns {
    fn default() -> Self {
        Self {
            minimal: Duration::from_secs(DEFAULT_MINIMAL_COOLDOWN_SECS),
            maximal: Duration::from_secs(DEFAULT_MAXIMAL_COOLDOWN_SECS),
        }
    }
}

pub struct AppState {
    latest: Option<FrameReport>,
    latest_tx: watch::Sender<Option<FrameReport>>,
    _latest_rx: watch::Receiver<Option<FrameReport>>,
    fps: f32,
    calibration: Arc<Calibration>,
    cooldowns: NavigationCooldowns,
    clock: Box<dyn Clock + Send + Sync>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("latest", &self.latest)
            .field("fps", &self.fps)
            .field("calibration", &self.calibration)
            .field("cooldowns", &self.cooldowns)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (latest_tx, latest_rx) = watch::channel(None);
        Self {
            latest: None,
            latest_tx,
            _latest_rx: latest_rx,
            fps: 0.0,
            calibration: Arc::new(Calibration::new()),
            cooldowns: NavigationCooldowns::default(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn latest(&self) -> Option<&FrameReport> {
        self.latest.as_ref()
    }

    pub fn subscribe_latest(&self) -> watch::Receiver<Option<FrameReport>> {
        self.latest_tx.subscribe()
    }

    pub fn set_latest(&mut self, report: FrameReport) -> Result<(), AppError> {
        self.latest = Some(report.clone());
        self.latest_tx
            .send(Some(report))
            .map_err(|_| AppError::WatchSend)
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
    }

    /// Shared with the frame pipeline, which performs the calibration.
    pub fn calibration(&self) -> &Arc<Calibration> {
        &self.calibration
    }

    /// Focal length in pixels, or 0 until calibrated.
    pub fn focal_length_pixels(&self) -> f32 {
        self.calibration.focal_length_px()
    }

    pub fn cooldowns(&self) -> NavigationCooldowns {
        self.cooldowns
    }

    pub fn set_cooldowns(&mut self, cooldowns: NavigationCooldowns) {
        self.cooldowns = cooldowns;
    }

    pub fn set_clock(&mut self, clock: Box<dyn Clock + Send + Sync>) {
        self.clock = clock;
    }

    pub fn health(&self) -> HealthStatus {
        if self.latest.is_none() {
            HealthStatus::Ko
        } else if !self.calibration.is_calibrated() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        }
    }

    fn streams(&self) -> Option<&AdvisoryStreams> {
        self.latest.as_ref().map(|report| &report.streams)
    }

    pub fn all_detection_sentences(&self) -> Vec<String> {
        self.streams()
            .map(|s| s.all_detections.clone())
            .unwrap_or_default()
    }

    pub fn center_detection_sentences(&self) -> Vec<String> {
        self.streams()
            .map(|s| s.center_detections.clone())
            .unwrap_or_default()
    }

    /// Entries of the all-detections log containing `name`.
    pub fn find_detections_by_class_name(&self, name: &str) -> Vec<String> {
        self.streams()
            .map(|s| {
                s.all_detections
                    .iter()
                    .filter(|sentence| sentence.contains(name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Walking directive, with repeats inside the minimal cooldown removed.
    pub fn minimal_nav_directions(&self) -> Vec<String> {
        self.streams()
            .map(|s| {
                dedup::filter_repeats(
                    &s.min_nav_directions,
                    self.cooldowns.minimal,
                    self.clock.as_ref(),
                )
            })
            .unwrap_or_default()
    }

    /// Per-class navigation sentences, with repeats inside the maximal
    /// cooldown removed.
    pub fn maximal_nav_directions(&self) -> Vec<String> {
        self.streams()
            .map(|s| {
                dedup::filter_repeats(
                    &s.max_nav_directions,
                    self.cooldowns.maximal,
                    self.clock.as_ref(),
                )
            })
            .unwrap_or_default()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CameraCharacteristics, StaticCamera};
    use std::time::{Instant, UNIX_EPOCH};

    struct FrozenClock(Instant);

    impl Clock for FrozenClock {
        fn now(&self) -> Instant {
            self.0
        }
    }

    fn report(streams: AdvisoryStreams) -> FrameReport {
        FrameReport {
            frame_index: 1,
            timestamp: UNIX_EPOCH + Duration::from_secs(1),
            image_width: 640,
            image_height: 480,
            objects: Vec::new(),
            streams,
        }
    }

    fn streams() -> AdvisoryStreams {
        AdvisoryStreams {
            all_detections: vec![
                "1 chair detected at Far-Left. Take 3 steps.".to_string(),
                "2 person detected at Near-Center, Mid-Right. Take 1 steps., Take 2 steps."
                    .to_string(),
            ],
            center_detections: vec!["Detected person at Near-Center. Take 1 steps.".to_string()],
            min_nav_directions: vec!["Move left".to_string()],
            max_nav_directions: vec![
                "1 chair detected at Far-Left. In 3 steps.".to_string(),
                "1 chair detected at Far-Left. In 3 steps.".to_string(),
            ],
        }
    }

    #[test]
    fn set_latest_updates_state_and_watch() -> Result<(), AppError> {
        let mut state = AppState::new();
        let receiver = state.subscribe_latest();

        state.set_latest(report(streams()))?;

        assert_eq!(state.latest().map(|r| r.frame_index), Some(1));
        assert_eq!(*receiver.borrow(), Some(report(streams())));
        Ok(())
    }

    #[test]
    fn set_latest_succeeds_without_subscribers() {
        let mut state = AppState::new();

        assert!(state.set_latest(report(streams())).is_ok());
    }

    #[test]
    fn accessors_are_empty_before_first_frame() {
        let state = AppState::new();

        assert!(state.all_detection_sentences().is_empty());
        assert!(state.center_detection_sentences().is_empty());
        assert!(state.minimal_nav_directions().is_empty());
        assert!(state.find_detections_by_class_name("person").is_empty());
        assert_eq!(state.health(), HealthStatus::Ko);
        assert_eq!(state.focal_length_pixels(), 0.0);
    }

    #[test]
    fn find_detections_matches_substring() -> Result<(), AppError> {
        let mut state = AppState::new();
        state.set_latest(report(streams()))?;

        let found = state.find_detections_by_class_name("person");

        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("2 person"));
        assert!(state.find_detections_by_class_name("dog").is_empty());
        Ok(())
    }

    #[test]
    fn maximal_directions_drop_repeats_within_cooldown() -> Result<(), AppError> {
        let mut state = AppState::new();
        state.set_clock(Box::new(FrozenClock(Instant::now())));
        state.set_latest(report(streams()))?;

        assert_eq!(
            state.maximal_nav_directions(),
            vec!["1 chair detected at Far-Left. In 3 steps."]
        );
        assert_eq!(state.minimal_nav_directions(), vec!["Move left"]);
        Ok(())
    }

    #[test]
    fn health_reflects_calibration() -> Result<(), AppError> {
        let mut state = AppState::new();
        state.set_latest(report(streams()))?;
        assert_eq!(state.health(), HealthStatus::Degraded);

        let mut camera = StaticCamera::new(Some(CameraCharacteristics {
            focal_length_mm: 4.0,
            sensor_width_mm: 5.0,
            pixel_array_width: 4000,
        }));
        state.calibration().ensure_initialized(&mut camera)?;

        assert_eq!(state.health(), HealthStatus::Ok);
        assert_eq!(state.focal_length_pixels(), 3200.0);
        Ok(())
    }
}
