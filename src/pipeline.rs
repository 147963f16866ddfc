// src/pipeline.rs - Per-frame processing: detect, measure, map, apply
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::audio::VolumeController;
use crate::hand::{find_landmark, HandDetector, Landmark, INDEX_FINGER_TIP, THUMB_TIP};
use crate::overlay::GaugeGeometry;
use crate::volume::{Calibration, VolumeMapping, VolumeReading};

/// Instantaneous frame rate from consecutive frame timestamps.
#[derive(Debug, Default)]
pub struct FrameClock {
    previous: Option<Instant>,
}

impl FrameClock {
    pub fn tick(&mut self, now: Instant) -> f32 {
        let fps = match self.previous {
            Some(prev) => {
                let dt = now.saturating_duration_since(prev).as_secs_f32();
                if dt > 0.0 {
                    1.0 / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.previous = Some(now);
        fps
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Pixel landmarks of every detected hand.
    pub hands: Vec<Vec<Landmark>>,
    /// Pixel landmarks of the tracked (first) hand, empty when no hand is visible.
    pub landmarks: Vec<Landmark>,
    /// Latest volume reading; carried over from earlier frames while no hand is visible.
    pub reading: Option<VolumeReading>,
    /// Whether `reading` was measured on this frame.
    pub fresh_reading: bool,
    pub fps: f32,
}

struct VolumeStage {
    mapping: VolumeMapping,
    controller: VolumeController,
}

pub struct FrameProcessor {
    detector: HandDetector,
    volume: Option<VolumeStage>,
    clock: FrameClock,
    last_reading: Option<VolumeReading>,
    detection_failures: u32,
}

impl FrameProcessor {
    /// Detection only; no volume is measured or applied.
    pub fn tracking_only(detector: HandDetector) -> Self {
        Self {
            detector,
            volume: None,
            clock: FrameClock::default(),
            last_reading: None,
            detection_failures: 0,
        }
    }

    pub fn with_volume(
        detector: HandDetector,
        controller: VolumeController,
        calibration: Calibration,
        gauge: GaugeGeometry,
    ) -> Self {
        let mapping = VolumeMapping::new(calibration, controller.range(), gauge);
        Self {
            detector,
            volume: Some(VolumeStage { mapping, controller }),
            clock: FrameClock::default(),
            last_reading: None,
            detection_failures: 0,
        }
    }

    pub fn detector(&self) -> &HandDetector {
        &self.detector
    }

    pub fn audio_endpoint(&self) -> Option<&'static str> {
        self.volume.as_ref().map(|stage| stage.controller.endpoint_name())
    }

    /// Consecutive frames on which the model failed; 0 once it answers again.
    pub fn detection_failures(&self) -> u32 {
        self.detection_failures
    }

    pub fn process(&mut self, frame: &RgbImage, now: Instant) -> FrameReport {
        let fps = self.clock.tick(now);
        let (width, height) = frame.dimensions();

        match self.detector.find_hands(frame) {
            Ok(_) if self.detection_failures > 0 => {
                info!("Hand detection recovered after {} failed frame(s)", self.detection_failures);
                self.detection_failures = 0;
            }
            Ok(_) => {}
            Err(e) if self.detection_failures == 0 => {
                warn!("Hand detection failed, treating frames as empty until it recovers: {}", e);
                self.detection_failures = 1;
            }
            Err(e) => {
                debug!("Hand detection still failing: {}", e);
                self.detection_failures += 1;
            }
        }

        let landmarks = self.detector.find_position(0, width, height);
        let hands = self.detector.all_positions(width, height);
        let mut fresh_reading = false;

        if let Some(stage) = self.volume.as_mut() {
            let tips = (
                find_landmark(&landmarks, THUMB_TIP),
                find_landmark(&landmarks, INDEX_FINGER_TIP),
            );
            if let (Some(thumb), Some(index)) = tips {
                let reading = stage.mapping.read(thumb.position(), index.position());
                debug!(
                    "Pinch {:.1}px -> {:.0}% (level {:.2})",
                    reading.distance, reading.percent, reading.level
                );

                if let Err(e) = stage.controller.apply(reading.level) {
                    warn!("Failed to set volume: {}", e);
                }
                self.last_reading = Some(reading);
                fresh_reading = true;
            }
        }

        FrameReport {
            hands,
            landmarks,
            reading: self.last_reading,
            fresh_reading,
            fps,
        }
    }
}
