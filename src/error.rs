// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open camera {index}: {reason}")]
    CameraOpen { index: u32, reason: String },

    #[error("camera failed to deliver a frame: {0}")]
    FrameRead(String),

    #[error("hand landmarker failed: {0}")]
    Landmarker(String),

    #[error("malformed landmarker message: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("audio endpoint error: {0}")]
    Audio(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
