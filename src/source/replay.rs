//! Replays head outputs recorded as JSON, looping at the end.
//!
//! ```json
//! { "frames": [ { "image_width": 640, "image_height": 480,
//!                 "strides": [ { "stride": 8, "cls": [[...]], "dis": [[...]] } ] } ] }
//! ```
//!
//! Tensors are in letterboxed network space for the configured target size.

use crate::detection::remap::Letterbox;
use crate::detection::tensors::{DEFAULT_STRIDES, RawTensors, StrideOutput, array_from_rows};
use crate::detection::InferenceFrame;
use crate::error::{AppError, DetectionError};
use crate::source::FrameSource;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Recording {
    frames: Vec<RecordedFrame>,
}

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    image_width: u32,
    image_height: u32,
    strides: Vec<RecordedStride>,
}

#[derive(Debug, Deserialize)]
struct RecordedStride {
    stride: u32,
    cls: Vec<Vec<f32>>,
    dis: Vec<Vec<f32>>,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read recording: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse recording: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid recording: {0}")]
    Invalid(String),
    #[error("invalid recorded tensors: {0}")]
    Tensor(#[from] DetectionError),
}

#[derive(Debug)]
pub struct ReplayFrameSource {
    frames: Vec<InferenceFrame>,
    next_index: usize,
}

impl ReplayFrameSource {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplayFrameSource {
    fn next_frame(&mut self) -> Result<InferenceFrame, AppError> {
        let index = self.next_index % self.frames.len().max(1);
        let frame = self
            .frames
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::FrameSource("recording has no frames".to_string()))?;
        self.next_index = index + 1;
        debug!(frame = index, "Replaying recorded frame");
        Ok(frame)
    }
}

pub fn load_from_path(
    path: impl AsRef<Path>,
    target_size: u32,
) -> Result<ReplayFrameSource, ReplayError> {
    let contents = std::fs::read_to_string(path)?;
    from_json(&contents, target_size)
}

pub fn from_json(contents: &str, target_size: u32) -> Result<ReplayFrameSource, ReplayError> {
    let recording: Recording = serde_json::from_str(contents)?;
    if recording.frames.is_empty() {
        return Err(ReplayError::Invalid("no frames recorded".to_string()));
    }

    let frames = recording
        .frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| build_frame(index, frame, target_size))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReplayFrameSource {
        frames,
        next_index: 0,
    })
}

fn build_frame(
    index: usize,
    frame: RecordedFrame,
    target_size: u32,
) -> Result<InferenceFrame, ReplayError> {
    if frame.image_width == 0 || frame.image_height == 0 {
        return Err(ReplayError::Invalid(format!(
            "frame {index} has zero image dimensions"
        )));
    }

    let strides = frame
        .strides
        .into_iter()
        .map(|recorded| -> Result<StrideOutput, ReplayError> {
            if !DEFAULT_STRIDES.contains(&recorded.stride) {
                warn!(
                    frame = index,
                    stride = recorded.stride,
                    "Recorded stride is not one of the detection head strides"
                );
            }
            let cls = array_from_rows(recorded.stride, &recorded.cls)?;
            let dis = array_from_rows(recorded.stride, &recorded.dis)?;
            Ok(StrideOutput::new(recorded.stride, cls, dis)?)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InferenceFrame {
        tensors: RawTensors::new(strides),
        image_width: frame.image_width,
        image_height: frame.image_height,
        letterbox: Letterbox::fit(frame.image_width, frame.image_height, target_size),
    })
}
