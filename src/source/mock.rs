//! Scripted frame source that synthesises head outputs for known objects.

use crate::detection::remap::Letterbox;
use crate::detection::tensors::{RawTensors, StrideOutput, array_from_shape};
use crate::detection::InferenceFrame;
use crate::error::AppError;
use crate::source::FrameSource;

/// Single stride level used for synthetic frames.
pub const MOCK_STRIDE: u32 = 32;
const MOCK_BINS: usize = 8;
const PEAK_LOGIT: f32 = 50.0;

/// An object centred on one grid cell of the mock stride.
///
/// The box extends `half_width_cells` strides to the left and right of the
/// cell centre and `half_height_cells` strides above and below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockObject {
    pub label: usize,
    pub score: f32,
    pub cell_col: usize,
    pub cell_row: usize,
    pub half_width_cells: usize,
    pub half_height_cells: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockFrameBehavior {
    pub next_frame_ok: bool,
    pub objects: Vec<MockObject>,
}

impl MockFrameBehavior {
    /// An empty scene.
    pub fn ok() -> Self {
        Self {
            next_frame_ok: true,
            objects: Vec::new(),
        }
    }

    pub fn with_objects(objects: Vec<MockObject>) -> Self {
        Self {
            next_frame_ok: true,
            objects,
        }
    }

    pub fn fail() -> Self {
        Self {
            next_frame_ok: false,
            objects: Vec::new(),
        }
    }
}

/// Plays back behaviours in order, then keeps producing empty scenes.
pub struct MockFrameSource {
    behaviors: Vec<MockFrameBehavior>,
    next_index: usize,
    image_width: u32,
    image_height: u32,
    num_classes: usize,
}

impl MockFrameSource {
    pub fn new(behaviors: Vec<MockFrameBehavior>) -> Self {
        Self {
            behaviors,
            next_index: 0,
            image_width: 416,
            image_height: 416,
            num_classes: 80,
        }
    }

    pub fn with_geometry(mut self, image_width: u32, image_height: u32) -> Self {
        self.image_width = image_width;
        self.image_height = image_height;
        self
    }

    fn next_behavior(&mut self) -> MockFrameBehavior {
        let behavior = self
            .behaviors
            .get(self.next_index)
            .cloned()
            .unwrap_or_else(MockFrameBehavior::ok);
        self.next_index += 1;
        behavior
    }
}

impl FrameSource for MockFrameSource {
    fn next_frame(&mut self) -> Result<InferenceFrame, AppError> {
        let behavior = self.next_behavior();
        if !behavior.next_frame_ok {
            return Err(AppError::FrameSource("mock frame unavailable".to_string()));
        }
        mock_frame(
            self.image_width,
            self.image_height,
            self.num_classes,
            &behavior.objects,
        )
    }
}

/// Build an unscaled frame whose stride-32 head reports `objects`.
///
/// Image dimensions should be multiples of [`MOCK_STRIDE`].
pub fn mock_frame(
    image_width: u32,
    image_height: u32,
    num_classes: usize,
    objects: &[MockObject],
) -> Result<InferenceFrame, AppError> {
    let cols = (image_width / MOCK_STRIDE) as usize;
    let rows = (image_height / MOCK_STRIDE) as usize;
    let cells = cols * rows;

    let mut class_scores = vec![0.0f32; cells * num_classes];
    let mut distribution = vec![0.0f32; cells * 4 * MOCK_BINS];

    for object in objects {
        if object.cell_col >= cols || object.cell_row >= rows || object.label >= num_classes {
            return Err(AppError::FrameSource(format!(
                "mock object outside grid or class range: {object:?}"
            )));
        }
        let cell = object.cell_row * cols + object.cell_col;
        class_scores[cell * num_classes + object.label] = object.score;

        let half_width = object.half_width_cells.min(MOCK_BINS - 1);
        let half_height = object.half_height_cells.min(MOCK_BINS - 1);
        let row = &mut distribution[cell * 4 * MOCK_BINS..(cell + 1) * 4 * MOCK_BINS];
        for (side, bin) in [half_width, half_height, half_width, half_height]
            .into_iter()
            .enumerate()
        {
            let start = side * MOCK_BINS;
            row[start..start + MOCK_BINS].fill(0.0);
            row[start + bin] = PEAK_LOGIT;
        }
    }

    let output = StrideOutput::new(
        MOCK_STRIDE,
        array_from_shape(MOCK_STRIDE, cells, num_classes, class_scores)?,
        array_from_shape(MOCK_STRIDE, cells, 4 * MOCK_BINS, distribution)?,
    )?;

    Ok(InferenceFrame {
        tensors: RawTensors::new(vec![output]),
        image_width,
        image_height,
        letterbox: Letterbox::identity(image_width, image_height),
    })
}
