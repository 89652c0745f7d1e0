use serde::Serialize;
use tracing::debug;

pub mod decode;
pub mod nms;
pub mod remap;
pub mod tensors;

use remap::Letterbox;
use tensors::RawTensors;

/// Axis-aligned box; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        if self.width <= 0.0 || self.height <= 0.0 {
            return 0.0;
        }
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub rect: Rect,
    pub label: usize,
    pub confidence: f32,
}

/// One frame's worth of head outputs together with the geometry needed to map
/// them back onto the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceFrame {
    pub tensors: RawTensors,
    pub image_width: u32,
    pub image_height: u32,
    pub letterbox: Letterbox,
}

/// Decode, suppress and remap one frame.
///
/// The result is in image pixel space, largest box first.
pub fn detect(
    frame: &InferenceFrame,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Vec<Detection> {
    let proposals = decode::decode_proposals(
        &frame.tensors,
        frame.letterbox.padded_width,
        frame.letterbox.padded_height,
        confidence_threshold,
    );
    let proposal_count = proposals.len();

    let mut detections = nms::rank_and_suppress(proposals, iou_threshold);
    remap::remap_to_image(
        &mut detections,
        &frame.letterbox,
        frame.image_width,
        frame.image_height,
    );
    remap::sort_by_area(&mut detections);

    debug!(
        proposals = proposal_count,
        kept = detections.len(),
        "Frame detections decoded"
    );
    detections
}
