// src/overlay.rs - Overlay drawn on top of each frame, as plain primitives in image pixel space
use image::Rgb;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::hand::HAND_CONNECTIONS;
use crate::pipeline::FrameReport;

pub const GAUGE_FILL_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const GAUGE_OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 250]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([50, 50, 50]);
pub const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
pub const CONNECTION_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const JOINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Vertical volume bar, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill_alpha: f32,
}

impl Default for GaugeGeometry {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 40.0,
            width: 50.0,
            height: 290.0,
            fill_alpha: 0.4,
        }
    }
}

impl GaugeGeometry {
    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    FilledRect {
        min: Point2<f32>,
        max: Point2<f32>,
        color: Rgb<u8>,
        alpha: f32,
    },
    StrokedRect {
        min: Point2<f32>,
        max: Point2<f32>,
        color: Rgb<u8>,
        thickness: f32,
    },
    Circle {
        center: Point2<f32>,
        radius: f32,
        color: Rgb<u8>,
    },
    Line {
        from: Point2<f32>,
        to: Point2<f32>,
        color: Rgb<u8>,
        thickness: f32,
    },
    /// `origin` is the bottom-left corner of the text.
    Text {
        origin: Point2<f32>,
        text: String,
        size: f32,
        color: Rgb<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub gauge: GaugeGeometry,
    /// Skeleton of every detected hand.
    pub draw_hands: bool,
    /// Large markers on the tracked hand's landmarks.
    pub draw_positions: bool,
    pub show_gauge: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPlan {
    pub primitives: Vec<Primitive>,
}

impl OverlayPlan {
    fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }
}

pub fn plan(report: &FrameReport, style: &OverlayStyle) -> OverlayPlan {
    let mut plan = OverlayPlan::default();

    if style.draw_hands {
        for hand in &report.hands {
            for &(a, b) in HAND_CONNECTIONS.iter() {
                if let (Some(from), Some(to)) = (hand.get(a), hand.get(b)) {
                    plan.push(Primitive::Line {
                        from: from.position(),
                        to: to.position(),
                        color: CONNECTION_COLOR,
                        thickness: 2.0,
                    });
                }
            }
            for lm in hand {
                plan.push(Primitive::Circle {
                    center: lm.position(),
                    radius: 3.0,
                    color: JOINT_COLOR,
                });
            }
        }
    }

    if style.draw_positions {
        for lm in &report.landmarks {
            plan.push(Primitive::Circle {
                center: lm.position(),
                radius: 15.0,
                color: HIGHLIGHT_COLOR,
            });
        }
    }

    if style.show_gauge {
        if let Some(reading) = &report.reading {
            let g = &style.gauge;
            plan.push(Primitive::FilledRect {
                min: Point2::new(g.left(), reading.bar_fill_y),
                max: Point2::new(g.right(), g.bottom()),
                color: GAUGE_FILL_COLOR,
                alpha: g.fill_alpha,
            });
            plan.push(Primitive::StrokedRect {
                min: Point2::new(g.left(), g.top()),
                max: Point2::new(g.right(), g.bottom()),
                color: GAUGE_OUTLINE_COLOR,
                thickness: 3.0,
            });
            plan.push(Primitive::Text {
                origin: Point2::new(g.left() - 10.0, g.bottom() + 40.0),
                text: reading.percent_label(),
                size: 28.0,
                color: LABEL_COLOR,
            });
        }
    }

    plan.push(Primitive::Text {
        origin: Point2::new(10.0, 70.0),
        text: format!("{}", report.fps as i32),
        size: 48.0,
        color: HIGHLIGHT_COLOR,
    });

    plan
}
