//! One-shot focal length calibration.
//!
//! The focal length in pixels is derived once from the camera's lens and
//! sensor characteristics and read without locking afterwards. A failed
//! attempt leaves the calibration empty so the next frame can retry.

use crate::error::AppError;
use std::sync::{Mutex, OnceLock};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraCharacteristics {
    pub focal_length_mm: f32,
    pub sensor_width_mm: f32,
    pub pixel_array_width: u32,
}

impl CameraCharacteristics {
    /// `focal_length_mm / sensor_width_mm * pixel_array_width`, or `None` when
    /// the inputs cannot produce a positive finite value.
    pub fn focal_length_px(&self) -> Option<f32> {
        if self.focal_length_mm <= 0.0 || self.sensor_width_mm <= 0.0 || self.pixel_array_width == 0
        {
            return None;
        }
        let focal = self.focal_length_mm / self.sensor_width_mm * self.pixel_array_width as f32;
        (focal.is_finite() && focal > 0.0).then_some(focal)
    }
}

/// Supplier of camera characteristics, queried until calibration succeeds.
pub trait CameraSource {
    fn characteristics(&mut self) -> Result<CameraCharacteristics, AppError>;
}

/// Camera characteristics taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCamera {
    characteristics: Option<CameraCharacteristics>,
}

impl StaticCamera {
    pub fn new(characteristics: Option<CameraCharacteristics>) -> Self {
        Self { characteristics }
    }
}

impl CameraSource for StaticCamera {
    fn characteristics(&mut self) -> Result<CameraCharacteristics, AppError> {
        self.characteristics
            .ok_or_else(|| AppError::Camera("no camera characteristics available".to_string()))
    }
}

#[derive(Debug, Default)]
pub struct Calibration {
    focal_length_px: OnceLock<f32>,
    init_lock: Mutex<()>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focal length in pixels, or 0 until calibrated.
    pub fn focal_length_px(&self) -> f32 {
        self.focal_length_px.get().copied().unwrap_or(0.0)
    }

    pub fn is_calibrated(&self) -> bool {
        self.focal_length_px.get().is_some()
    }

    /// Initialise from `source` unless already calibrated. Safe to call from
    /// several threads; only one of them queries the source.
    pub fn ensure_initialized<C>(&self, source: &mut C) -> Result<f32, AppError>
    where
        C: CameraSource + ?Sized,
    {
        if let Some(focal) = self.focal_length_px.get() {
            return Ok(*focal);
        }

        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| AppError::Camera("calibration lock poisoned".to_string()))?;
        if let Some(focal) = self.focal_length_px.get() {
            return Ok(*focal);
        }

        let characteristics = source.characteristics()?;
        let Some(focal) = characteristics.focal_length_px() else {
            warn!(
                focal_length_mm = characteristics.focal_length_mm,
                sensor_width_mm = characteristics.sensor_width_mm,
                pixel_array_width = characteristics.pixel_array_width,
                "Camera characteristics do not yield a usable focal length"
            );
            return Err(AppError::Camera(
                "invalid camera characteristics".to_string(),
            ));
        };

        let focal = *self.focal_length_px.get_or_init(|| focal);
        info!(focal_length_px = focal, "Camera calibrated");
        Ok(focal)
    }
}
