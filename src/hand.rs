// src/hand.rs - Hand landmark detection and pixel-space landmark extraction
use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const LANDMARK_COUNT: usize = 21;

pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_TIP: usize = 8;

/// Bone segments of the 21-point hand model, as landmark id pairs.
#[rustfmt::skip]
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Landmark as reported by the model, relative to the image size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectedHand {
    pub landmarks: Vec<NormalizedLandmark>,
    pub handedness: Option<String>,
    pub score: f32,
}

/// A landmark placed on the image grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landmark {
    pub id: usize,
    pub x: i32,
    pub y: i32,
}

impl Landmark {
    pub fn position(&self) -> Point2<f32> {
        Point2::new(self.x as f32, self.y as f32)
    }
}

pub fn landmarks_to_pixels(landmarks: &[NormalizedLandmark], width: u32, height: u32) -> Vec<Landmark> {
    let (w, h) = (width as f32, height as f32);
    landmarks
        .iter()
        .enumerate()
        .map(|(id, lm)| Landmark {
            id,
            x: (lm.x * w).round() as i32,
            y: (lm.y * h).round() as i32,
        })
        .collect()
}

/// Looks up a landmark by id in an extracted list.
pub fn find_landmark(landmarks: &[Landmark], id: usize) -> Option<&Landmark> {
    landmarks.iter().find(|lm| lm.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Treat every frame as an unrelated still image instead of a video stream.
    pub static_image_mode: bool,
    pub max_num_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            static_image_mode: false,
            max_num_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl DetectorOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_num_hands == 0 {
            return Err(Error::Config("max_num_hands must be at least 1".into()));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// An external hand-pose model.
pub trait HandLandmarker {
    fn name(&self) -> &str;

    fn configure(&mut self, _options: &DetectorOptions) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, frame: &RgbImage) -> Result<Vec<DetectedHand>>;
}

pub struct HandDetector {
    options: DetectorOptions,
    landmarker: Box<dyn HandLandmarker>,
    results: Vec<DetectedHand>,
}

impl HandDetector {
    pub fn new(options: DetectorOptions, mut landmarker: Box<dyn HandLandmarker>) -> Result<Self> {
        options.validate()?;
        landmarker.configure(&options)?;

        Ok(Self {
            options,
            landmarker,
            results: Vec::new(),
        })
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    pub fn landmarker_name(&self) -> &str {
        self.landmarker.name()
    }

    /// Runs the model on `frame`. The result is kept until the next call.
    pub fn find_hands(&mut self, frame: &RgbImage) -> Result<&[DetectedHand]> {
        self.results.clear();

        let mut hands = self.landmarker.process(frame)?;
        if hands.len() > self.options.max_num_hands {
            debug!(
                "Dropping {} hand(s) over the limit of {}",
                hands.len() - self.options.max_num_hands,
                self.options.max_num_hands
            );
            hands.truncate(self.options.max_num_hands);
        }

        self.results = hands;
        Ok(&self.results)
    }

    pub fn hands(&self) -> &[DetectedHand] {
        &self.results
    }

    /// Pixel landmarks of hand `hand_no` from the last detection, empty if there is no such hand.
    pub fn find_position(&self, hand_no: usize, width: u32, height: u32) -> Vec<Landmark> {
        self.results
            .get(hand_no)
            .map(|hand| landmarks_to_pixels(&hand.landmarks, width, height))
            .unwrap_or_default()
    }

    pub fn all_positions(&self, width: u32, height: u32) -> Vec<Vec<Landmark>> {
        self.results
            .iter()
            .map(|hand| landmarks_to_pixels(&hand.landmarks, width, height))
            .collect()
    }
}

/// Open right hand, palm facing the camera.
#[rustfmt::skip]
const RESTING_HAND: [(f32, f32); LANDMARK_COUNT] = [
    (0.50, 0.90),
    (0.42, 0.84), (0.35, 0.77), (0.29, 0.71), (0.25, 0.65),
    (0.52, 0.55), (0.55, 0.40), (0.58, 0.29), (0.60, 0.20),
    (0.60, 0.56), (0.63, 0.40), (0.65, 0.29), (0.66, 0.20),
    (0.67, 0.59), (0.70, 0.45), (0.72, 0.36), (0.73, 0.28),
    (0.73, 0.64), (0.77, 0.54), (0.79, 0.47), (0.81, 0.41),
];

/// Stands in for a real model: one hand that slowly pinches and opens.
pub struct SimulatedLandmarker {
    sim_time: f32,
    step: f32,
}

impl Default for SimulatedLandmarker {
    fn default() -> Self {
        Self {
            sim_time: 0.0,
            step: 0.033,
        }
    }
}

impl SimulatedLandmarker {
    /// How far the thumb and index tips are pulled together, 0 (open) to 1 (pinched).
    fn closure(&self) -> f32 {
        0.5 + 0.5 * (self.sim_time * 0.8).sin()
    }

    fn current_hand(&self) -> DetectedHand {
        let (tx, ty) = RESTING_HAND[THUMB_TIP];
        let (ix, iy) = RESTING_HAND[INDEX_FINGER_TIP];
        let mid = ((tx + ix) / 2.0, (ty + iy) / 2.0);
        let pull = self.closure() * 0.9;

        let landmarks = RESTING_HAND
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| {
                // thumb IP/tip and index DIP/tip follow the pinch
                let weight = match id {
                    3 | 7 => pull * 0.5,
                    THUMB_TIP | INDEX_FINGER_TIP => pull,
                    _ => 0.0,
                };
                NormalizedLandmark::new(x + (mid.0 - x) * weight, y + (mid.1 - y) * weight, 0.0)
            })
            .collect();

        DetectedHand {
            landmarks,
            handedness: Some("Right".to_string()),
            score: 1.0,
        }
    }
}

impl HandLandmarker for SimulatedLandmarker {
    fn name(&self) -> &str {
        "simulation"
    }

    fn process(&mut self, _frame: &RgbImage) -> Result<Vec<DetectedHand>> {
        let hand = self.current_hand();
        self.sim_time += self.step;
        Ok(vec![hand])
    }
}
