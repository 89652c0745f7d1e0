//! Per-frame processing: detect, calibrate, analyse and publish.

use crate::calibration::{Calibration, CameraSource};
use crate::classes::ClassTable;
use crate::config::{
    Config, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_STEP_LENGTH_M,
};
use crate::detection::{self, Detection, InferenceFrame};
use crate::error::AppError;
use crate::navigation::{self, FrameGeometry};
use crate::source::FrameSource;
use crate::state::{AppState, DetectedObject, FrameReport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

pub const FPS_WINDOW: usize = 10;

/// Moving average of the instantaneous frame rate.
#[derive(Debug, Clone, Default)]
pub struct FrameRate {
    samples: VecDeque<f32>,
    last_tick: Option<Instant>,
}

impl FrameRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame finishing at `now` and return the current average.
    pub fn tick(&mut self, now: Instant) -> f32 {
        if let Some(last) = self.last_tick {
            let elapsed = now.saturating_duration_since(last).as_secs_f32();
            if elapsed > 0.0 {
                if self.samples.len() == FPS_WINDOW {
                    self.samples.pop_front();
                }
                self.samples.push_back(1.0 / elapsed);
            }
        }
        self.last_tick = Some(now);
        self.current()
    }

    /// Average over the last [`FPS_WINDOW`] samples, 0 until the window is full.
    pub fn current(&self) -> f32 {
        if self.samples.len() < FPS_WINDOW {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / FPS_WINDOW as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorSettings {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub step_length_m: f32,
}

impl NavigatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold(),
            iou_threshold: config.iou_threshold(),
            step_length_m: config.step_length_m(),
        }
    }
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            step_length_m: DEFAULT_STEP_LENGTH_M,
        }
    }
}

/// Owns everything needed to turn head outputs into advisories. Shared behind
/// a `Mutex`, which serialises frame processing.
pub struct Navigator {
    classes: ClassTable,
    camera: Box<dyn CameraSource + Send>,
    calibration: Arc<Calibration>,
    settings: NavigatorSettings,
    frame_rate: FrameRate,
    frames_processed: u64,
    calibration_warned: bool,
}

impl Navigator {
    pub fn new(
        classes: ClassTable,
        camera: Box<dyn CameraSource + Send>,
        calibration: Arc<Calibration>,
        settings: NavigatorSettings,
    ) -> Self {
        Self {
            classes,
            camera,
            calibration,
            settings,
            frame_rate: FrameRate::new(),
            frames_processed: 0,
            calibration_warned: false,
        }
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn settings(&self) -> NavigatorSettings {
        self.settings
    }

    pub fn fps(&self) -> f32 {
        self.frame_rate.current()
    }

    /// Detections for `frame` in image space, largest first.
    pub fn detect(&self, frame: &InferenceFrame) -> Vec<Detection> {
        detection::detect(
            frame,
            self.settings.confidence_threshold,
            self.settings.iou_threshold,
        )
    }

    /// Focal length in pixels, calibrating on first use. 0 while the camera
    /// cannot be calibrated.
    fn focal_length_px(&mut self) -> f32 {
        match self.calibration.ensure_initialized(self.camera.as_mut()) {
            Ok(focal) => focal,
            Err(err) => {
                if self.calibration_warned {
                    debug!(error = %err, "Calibration still unavailable");
                } else {
                    warn!(error = %err, "Calibration unavailable, distances will be skipped");
                    self.calibration_warned = true;
                }
                0.0
            }
        }
    }

    pub fn process_frame(&mut self, frame: &InferenceFrame) -> FrameReport {
        let detections = self.detect(frame);
        let focal_length_px = self.focal_length_px();
        let analysis = navigation::analyze_frame(
            &detections,
            &self.classes,
            FrameGeometry {
                width: frame.image_width,
                height: frame.image_height,
                focal_length_px,
            },
            self.settings.step_length_m,
        );

        let objects = detections
            .iter()
            .map(|d| DetectedObject {
                label: d.label,
                class_name: self.classes.name(d.label).map(str::to_string),
                confidence: d.confidence,
                rect: d.rect,
            })
            .collect();

        self.frames_processed += 1;
        let fps = self.frame_rate.tick(Instant::now());
        debug!(
            frame = self.frames_processed,
            detections = detections.len(),
            directive = %analysis.directive,
            fps,
            "Frame processed"
        );

        FrameReport {
            frame_index: self.frames_processed,
            timestamp: SystemTime::now(),
            image_width: frame.image_width,
            image_height: frame.image_height,
            objects,
            streams: analysis.streams,
        }
    }
}

/// Process one frame under the frame lock and publish the result.
pub fn process_and_publish(
    navigator: &Mutex<Navigator>,
    frame: &InferenceFrame,
    state: &Arc<RwLock<AppState>>,
) -> Result<FrameReport, AppError> {
    let (report, fps) = {
        let mut guard = navigator.lock().map_err(|_| AppError::DetectorLock)?;
        let report = guard.process_frame(frame);
        (report, guard.fps())
    };

    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.set_fps(fps);
    guard.set_latest(report.clone())?;

    Ok(report)
}

pub fn run_frame_cycle<S>(
    source: &mut S,
    navigator: &Mutex<Navigator>,
    state: &Arc<RwLock<AppState>>,
) -> Result<FrameReport, AppError>
where
    S: FrameSource + ?Sized,
{
    let frame = source.next_frame()?;
    process_and_publish(navigator, &frame, state)
}

pub fn spawn_frame_thread<S>(
    mut source: S,
    navigator: Arc<Mutex<Navigator>>,
    state: Arc<RwLock<AppState>>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()>
where
    S: FrameSource + Send + 'static,
{
    std::thread::spawn(move || {
        info!(
            interval_ms = interval.as_millis(),
            "Frame thread started"
        );

        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            if let Err(e) = run_frame_cycle(&mut source, &navigator, &state) {
                warn!("Error processing frame: {}", e);
            }

            sleep_with_stop(interval, &stop, cycle_start);
        }

        info!("Frame thread stopped");
    })
}

fn sleep_with_stop(duration: Duration, stop: &AtomicBool, start: Instant) {
    let elapsed = start.elapsed();
    if elapsed >= duration {
        return;
    }
    let remaining = duration - elapsed;
    let step = Duration::from_millis(100).min(remaining);
    let mut slept = Duration::ZERO;

    while slept < remaining {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(step);
        slept += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CameraCharacteristics, StaticCamera};
    use crate::source::mock::{MockFrameBehavior, MockFrameSource, MockObject};

    fn camera() -> StaticCamera {
        StaticCamera::new(Some(CameraCharacteristics {
            focal_length_mm: 4.0,
            sensor_width_mm: 5.0,
            pixel_array_width: 416,
        }))
    }

    fn person_ahead() -> MockObject {
        MockObject {
            label: 0,
            score: 0.9,
            cell_col: 6,
            cell_row: 10,
            half_width_cells: 1,
            half_height_cells: 2,
        }
    }

    fn navigator(camera: StaticCamera, calibration: Arc<Calibration>) -> Navigator {
        Navigator::new(
            ClassTable::coco(),
            Box::new(camera),
            calibration,
            NavigatorSettings::default(),
        )
    }

    #[test]
    fn frame_rate_needs_full_window() {
        let mut rate = FrameRate::new();
        let start = Instant::now();

        for i in 0..FPS_WINDOW as u64 {
            assert_eq!(rate.tick(start + Duration::from_millis(100 * i)), 0.0);
        }
        let fps = rate.tick(start + Duration::from_millis(100 * FPS_WINDOW as u64));

        assert!((fps - 10.0).abs() < 0.01);
    }

    #[test]
    fn process_frame_builds_streams() -> Result<(), AppError> {
        let calibration = Arc::new(Calibration::new());
        let mut navigator = navigator(camera(), Arc::clone(&calibration));
        let mut source = MockFrameSource::new(vec![MockFrameBehavior::with_objects(vec![
            person_ahead(),
        ])]);

        let report = navigator.process_frame(&source.next_frame()?);

        // focal 332.8 px, person 1.7 m over 128 px: 4.42 m, 5 steps.
        assert_eq!(report.frame_index, 1);
        assert_eq!(report.objects.len(), 1);
        assert_eq!(report.objects[0].class_name.as_deref(), Some("person"));
        assert_eq!(
            report.streams.all_detections,
            vec!["1 person detected at Near-Center. Take 5 steps."]
        );
        assert_eq!(report.streams.min_nav_directions, vec!["Move left"]);
        assert!(calibration.is_calibrated());
        Ok(())
    }

    #[test]
    fn uncalibrated_frame_keeps_objects_but_no_advisories() -> Result<(), AppError> {
        let mut navigator = navigator(StaticCamera::new(None), Arc::new(Calibration::new()));
        let mut source = MockFrameSource::new(vec![MockFrameBehavior::with_objects(vec![
            person_ahead(),
        ])]);

        let report = navigator.process_frame(&source.next_frame()?);

        assert_eq!(report.objects.len(), 1);
        assert!(report.streams.all_detections.is_empty());
        assert_eq!(report.streams.min_nav_directions, vec!["Continue ahead"]);
        Ok(())
    }

    #[test]
    fn run_frame_cycle_publishes_to_state() -> Result<(), AppError> {
        let state = Arc::new(RwLock::new(AppState::new()));
        let calibration = {
            let guard = state.read().map_err(|_| AppError::StateLock)?;
            Arc::clone(guard.calibration())
        };
        let navigator = Mutex::new(navigator(camera(), calibration));
        let mut source = MockFrameSource::new(vec![MockFrameBehavior::with_objects(vec![
            person_ahead(),
        ])]);

        run_frame_cycle(&mut source, &navigator, &state)?;

        let guard = state.read().map_err(|_| AppError::StateLock)?;
        assert_eq!(guard.latest().map(|r| r.frame_index), Some(1));
        assert_eq!(
            guard.center_detection_sentences(),
            vec!["Detected person at Near-Center. Take 5 steps."]
        );
        assert!(guard.focal_length_pixels() > 0.0);
        Ok(())
    }

    #[test]
    fn failed_frame_leaves_state_untouched() -> Result<(), AppError> {
        let state = Arc::new(RwLock::new(AppState::new()));
        let navigator = Mutex::new(navigator(camera(), Arc::new(Calibration::new())));
        let mut source = MockFrameSource::new(vec![MockFrameBehavior::fail()]);

        assert!(run_frame_cycle(&mut source, &navigator, &state).is_err());

        let guard = state.read().map_err(|_| AppError::StateLock)?;
        assert!(guard.latest().is_none());
        Ok(())
    }

    #[test]
    fn frame_thread_stops_on_flag() -> Result<(), AppError> {
        let state = Arc::new(RwLock::new(AppState::new()));
        let navigator = Arc::new(Mutex::new(navigator(camera(), Arc::new(Calibration::new()))));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_frame_thread(
            MockFrameSource::new(Vec::new()),
            navigator,
            Arc::clone(&state),
            Duration::from_millis(10),
            Arc::clone(&stop),
        );
        std::thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::Relaxed);
        assert!(handle.join().is_ok());

        let guard = state.read().map_err(|_| AppError::StateLock)?;
        assert!(guard.latest().is_some());
        Ok(())
    }
}
