use crate::detection::InferenceFrame;
use crate::error::AppError;

pub mod mock;
pub mod replay;

/// Supplier of head outputs, one frame per call.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<InferenceFrame, AppError>;
}

impl<S> FrameSource for Box<S>
where
    S: FrameSource + ?Sized,
{
    fn next_frame(&mut self) -> Result<InferenceFrame, AppError> {
        (**self).next_frame()
    }
}
