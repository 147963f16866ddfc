// src/config.rs
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::AudioBackend;
use crate::error::{Error, Result};
use crate::hand::DetectorOptions;
use crate::overlay::GaugeGeometry;
use crate::volume::Calibration;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_index: u32,
    /// Flip frames horizontally so the preview behaves like a mirror.
    pub mirror: bool,
    pub detector: DetectorOptions,
    pub calibration: Calibration,
    pub gauge: GaugeGeometry,
    pub audio_backend: AudioBackend,
    /// Helper program (and arguments) running the hand model. The built-in simulation is used when unset.
    pub landmarker_command: Option<Vec<String>>,
    pub draw_hands: bool,
    pub draw_positions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            mirror: true,
            detector: DetectorOptions {
                min_detection_confidence: 0.7,
                ..DetectorOptions::default()
            },
            calibration: Calibration::default(),
            gauge: GaugeGeometry::default(),
            audio_backend: AudioBackend::Auto,
            landmarker_command: None,
            draw_hands: false,
            draw_positions: false,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "handvolume", "hand_volume")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Settings from the user config directory, or the defaults when there is no settings file.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            Some(path) => {
                debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.calibration.validate()?;

        if self.gauge.width <= 0.0 || self.gauge.height <= 0.0 {
            return Err(Error::Config("gauge width and height must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.gauge.fill_alpha) {
            return Err(Error::Config("gauge fill_alpha must be within [0, 1]".into()));
        }
        if matches!(&self.landmarker_command, Some(cmd) if cmd.is_empty()) {
            return Err(Error::Config("landmarker_command must name a program".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_settings(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_the_calibrated_setup() {
        let s = Settings::default();
        assert_eq!(s.camera_index, 0);
        assert_eq!(s.detector.min_detection_confidence, 0.7);
        assert_eq!(s.detector.min_tracking_confidence, 0.5);
        assert_eq!(s.detector.max_num_hands, 2);
        assert_eq!(s.calibration.min_distance, 50.0);
        assert_eq!(s.calibration.max_distance, 280.0);
        assert_eq!(s.gauge.bottom(), 330.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_settings(
            r#"{"camera_index": 1, "audio_backend": "dry-run", "detector": {"max_num_hands": 1}}"#,
        );
        let s = Settings::from_path(file.path()).unwrap();

        assert_eq!(s.camera_index, 1);
        assert_eq!(s.audio_backend, AudioBackend::DryRun);
        assert_eq!(s.detector.max_num_hands, 1);
        assert_eq!(s.detector.min_detection_confidence, 0.5);
        assert_eq!(s.calibration, Calibration::default());
        assert!(s.mirror);
    }

    #[test]
    fn invalid_confidence_is_rejected() {
        let file = write_settings(r#"{"detector": {"min_tracking_confidence": -0.1}}"#);
        assert!(matches!(Settings::from_path(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let file = write_settings("{ camera_index: 1 ");
        assert!(matches!(Settings::from_path(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn empty_landmarker_command_is_rejected() {
        let s = Settings {
            landmarker_command: Some(vec![]),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let s = Settings {
            landmarker_command: Some(vec!["python3".into(), "hands.py".into()]),
            draw_hands: true,
            ..Settings::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        let file = write_settings(&json);
        assert_eq!(Settings::from_path(file.path()).unwrap(), s);
    }
}
