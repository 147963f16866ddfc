// src/lib.rs
pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod hand;
pub mod mediapipe_bridge;
pub mod overlay;
pub mod pipeline;
pub mod ui;
pub mod video;
pub mod volume;

pub use error::{Error, Result};
