//! Mapping between letterboxed network space and original image pixels.

use crate::detection::Detection;

/// Padded network inputs are aligned to this many pixels.
pub const PAD_ALIGNMENT: u32 = 32;

/// Scale and padding used to fit an image into the network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_width: u32,
    pub pad_height: u32,
    pub padded_width: u32,
    pub padded_height: u32,
}

impl Letterbox {
    /// Resize so the longer side equals `target_size`, then pad both sides up
    /// to a multiple of 32.
    pub fn fit(image_width: u32, image_height: u32, target_size: u32) -> Self {
        let (scale, width, height) = if image_width > image_height {
            let scale = target_size as f32 / image_width as f32;
            (scale, target_size, (image_height as f32 * scale) as u32)
        } else {
            let scale = target_size as f32 / image_height.max(1) as f32;
            (scale, (image_width as f32 * scale) as u32, target_size)
        };
        let pad_width = align_up(width) - width;
        let pad_height = align_up(height) - height;
        Self {
            scale,
            pad_width,
            pad_height,
            padded_width: width + pad_width,
            padded_height: height + pad_height,
        }
    }

    /// A letterbox that leaves coordinates untouched.
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            scale: 1.0,
            pad_width: 0,
            pad_height: 0,
            padded_width: width,
            padded_height: height,
        }
    }

    fn half_pad_x(&self) -> f32 {
        (self.pad_width / 2) as f32
    }

    fn half_pad_y(&self) -> f32 {
        (self.pad_height / 2) as f32
    }
}

fn align_up(value: u32) -> u32 {
    value.div_ceil(PAD_ALIGNMENT) * PAD_ALIGNMENT
}

/// Move detections from network space into image space, clipped to the image.
pub fn remap_to_image(
    detections: &mut [Detection],
    letterbox: &Letterbox,
    image_width: u32,
    image_height: u32,
) {
    let max_x = image_width.saturating_sub(1) as f32;
    let max_y = image_height.saturating_sub(1) as f32;
    let scale = if letterbox.scale > 0.0 {
        letterbox.scale
    } else {
        1.0
    };

    for detection in detections.iter_mut() {
        let rect = detection.rect;
        let x0 = ((rect.x - letterbox.half_pad_x()) / scale).clamp(0.0, max_x);
        let y0 = ((rect.y - letterbox.half_pad_y()) / scale).clamp(0.0, max_y);
        let x1 = ((rect.right() - letterbox.half_pad_x()) / scale).clamp(0.0, max_x);
        let y1 = ((rect.bottom() - letterbox.half_pad_y()) / scale).clamp(0.0, max_y);

        detection.rect.x = x0;
        detection.rect.y = y0;
        detection.rect.width = x1 - x0;
        detection.rect.height = y1 - y0;
    }
}

/// Largest boxes first.
pub fn sort_by_area(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.rect.area().total_cmp(&a.rect.area()));
}
