use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("frame source error: {0}")]
    FrameSource(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),
    #[error("watch channel send failed")]
    WatchSend,
    #[error("state lock poisoned")]
    StateLock,
    #[error("detector lock poisoned")]
    DetectorLock,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectionError {
    #[error("tensor shape mismatch for stride {stride}: {reason}")]
    TensorShape { stride: u32, reason: String },
    #[error("stride must be non-zero")]
    ZeroStride,
}
