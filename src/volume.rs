// src/volume.rs - Maps the thumb/index pinch distance onto volume, percentage and gauge fill
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::audio::VolumeRange;
use crate::error::{Error, Result};
use crate::overlay::GaugeGeometry;

/// Euclidean distance between two pixel positions.
pub fn distance(a: Point2<f32>, b: Point2<f32>) -> f32 {
    nalgebra::distance(&a, &b)
}

/// Affine map of `x` from `from` onto `to`, clamped to the ends of `to`.
///
/// `to` may be descending; the gauge fill runs from the bar bottom up to its top.
pub fn interp(x: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let (x0, x1) = from;
    let (y0, y1) = to;

    if x <= x0 {
        return y0;
    }
    if x >= x1 {
        return y1;
    }

    let t = (x - x0) / (x1 - x0);
    y0 + t * (y1 - y0)
}

/// Pinch distances (in pixels) that correspond to silence and to full volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            min_distance: 50.0,
            max_distance: 280.0,
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<()> {
        if !self.min_distance.is_finite() || !self.max_distance.is_finite() {
            return Err(Error::Config("calibration distances must be finite".into()));
        }
        if self.min_distance >= self.max_distance {
            return Err(Error::Config(format!(
                "calibration min_distance ({}) must be below max_distance ({})",
                self.min_distance, self.max_distance
            )));
        }
        Ok(())
    }

    fn bounds(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeReading {
    pub distance: f32,
    /// Target level in the endpoint's native units.
    pub level: f32,
    pub percent: f32,
    /// Image row where the gauge fill starts.
    pub bar_fill_y: f32,
}

impl VolumeReading {
    pub fn percent_label(&self) -> String {
        format!("{} %", self.percent.trunc() as i32)
    }
}

#[derive(Debug, Clone)]
pub struct VolumeMapping {
    calibration: Calibration,
    range: VolumeRange,
    gauge: GaugeGeometry,
}

impl VolumeMapping {
    pub fn new(calibration: Calibration, range: VolumeRange, gauge: GaugeGeometry) -> Self {
        Self {
            calibration,
            range,
            gauge,
        }
    }

    pub fn read(&self, thumb: Point2<f32>, index: Point2<f32>) -> VolumeReading {
        self.read_distance(distance(thumb, index))
    }

    pub fn read_distance(&self, distance: f32) -> VolumeReading {
        let bounds = self.calibration.bounds();

        VolumeReading {
            distance,
            level: interp(distance, bounds, (self.range.min, self.range.max)),
            percent: interp(distance, bounds, (0.0, 100.0)),
            bar_fill_y: interp(distance, bounds, (self.gauge.bottom(), self.gauge.top())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> VolumeMapping {
        VolumeMapping::new(
            Calibration::default(),
            VolumeRange::new(-65.25, 0.0, 0.03125),
            GaugeGeometry::default(),
        )
    }

    #[test]
    fn three_four_five_triangle() {
        let d = distance(Point2::new(4.0, 3.0), Point2::new(0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn short_pinch_is_silent() {
        let m = mapping();
        for d in [0.0, 10.0, 49.9, 50.0] {
            let r = m.read_distance(d);
            assert_eq!(r.percent, 0.0);
            assert_eq!(r.level, -65.25);
        }
    }

    #[test]
    fn wide_pinch_is_full_volume() {
        let m = mapping();
        for d in [280.0, 281.0, 1000.0] {
            let r = m.read_distance(d);
            assert_eq!(r.percent, 100.0);
            assert_eq!(r.level, 0.0);
        }
    }

    #[test]
    fn midpoint_is_half_volume() {
        let r = mapping().read_distance(165.0);
        assert!((r.percent - 50.0).abs() < 1e-4);
        assert!((r.level - -32.625).abs() < 1e-3);
        assert_eq!(r.percent_label(), "50 %");
    }

    #[test]
    fn gauge_fill_runs_bottom_to_top() {
        let m = mapping();
        let gauge = GaugeGeometry::default();

        assert_eq!(m.read_distance(50.0).bar_fill_y, gauge.bottom());
        assert_eq!(m.read_distance(280.0).bar_fill_y, gauge.top());

        let mid = m.read_distance(165.0).bar_fill_y;
        assert!((mid - (gauge.top() + gauge.bottom()) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn interp_handles_descending_output() {
        assert_eq!(interp(0.0, (0.0, 10.0), (100.0, 0.0)), 100.0);
        assert_eq!(interp(5.0, (0.0, 10.0), (100.0, 0.0)), 50.0);
        assert_eq!(interp(20.0, (0.0, 10.0), (100.0, 0.0)), 0.0);
    }

    #[test]
    fn percent_label_truncates() {
        let r = mapping().read_distance(50.0 + 230.0 * 0.999);
        assert_eq!(r.percent_label(), "99 %");
    }

    #[test]
    fn calibration_rejects_inverted_range() {
        let c = Calibration {
            min_distance: 300.0,
            max_distance: 280.0,
        };
        assert!(c.validate().is_err());
        assert!(Calibration::default().validate().is_ok());
    }
}
