// src/video.rs - Camera capture
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Logs every camera the native backend can see.
pub fn list_cameras() {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => {
            info!("Found {} camera(s)", cameras.len());
            for camera in &cameras {
                info!("  [{}] {}", camera.index(), camera.human_name());
            }
        }
        Err(e) => warn!("Failed to query cameras: {}", e),
    }
}

pub struct VideoSource {
    camera: Camera,
    index: u32,
    mirror: bool,
}

impl VideoSource {
    pub fn open(index: u32, mirror: bool) -> Result<Self> {
        let open_error = |e: nokhwa::NokhwaError| Error::CameraOpen {
            index,
            reason: e.to_string(),
        };

        let format = CameraFormat::new(Resolution::new(640, 480), FrameFormat::MJPEG, 30);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(open_error)?;
        camera.open_stream().map_err(open_error)?;

        let resolution = camera.resolution();
        info!(
            "Opened camera {} ({}) at {}x{} @ {} fps",
            index,
            camera.info().human_name(),
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        Ok(Self { camera, index, mirror })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn read_frame(&mut self) -> Result<RgbImage> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| Error::FrameRead(e.to_string()))?;

        let mut frame = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::FrameRead(format!("failed to decode frame: {}", e)))?;

        if self.mirror {
            image::imageops::flip_horizontal_in_place(&mut frame);
        }
        Ok(frame)
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera {}: {}", self.index, e);
        }
    }
}
