use thiserror::Error;

/// Failures surfaced by the live classification loop and its collaborators.
///
/// Payloads are plain strings so errors can travel inside events and effects,
/// which are cloned and compared by the state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Frame source failed: {0}")]
    FrameSource(String),

    #[error("Classification loop is no longer running")]
    LoopClosed,
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ModelLoad(_) => "MODEL_LOAD_ERROR",
            Error::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            Error::Inference(_) => "INFERENCE_ERROR",
            Error::FrameSource(_) => "FRAME_SOURCE_ERROR",
            Error::LoopClosed => "LOOP_CLOSED",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
