use std::path::PathBuf;

/// Errors produced by the inspection pipeline.
///
/// `NoCandidate` and `EmptyMask` are per-frame conditions. The public entry
/// points turn them into `Ok(None)` so a polling caller can simply try the
/// next frame; the strict helpers return them as errors.
#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    /// No connector-sized region in the current frame.
    #[error("no connector candidate in frame")]
    NoCandidate,

    /// A mask produced zero contours where at least one was required.
    #[error("mask contains no contours")]
    EmptyMask,

    /// A stage was called with input it cannot process.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The frame source was read before it was started.
    #[error("frame stream has not been started")]
    StreamNotStarted,

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("debug directory is not empty: {}", .0.display())]
    DebugDirNotEmpty(PathBuf),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InspectionError {
    /// True for conditions that mean "nothing to inspect in this frame".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoCandidate | Self::EmptyMask)
    }
}

pub type Result<T> = std::result::Result<T, InspectionError>;
