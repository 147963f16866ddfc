// src/ui.rs - Paints overlay plans with egui
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2};
use image::Rgb;
use nalgebra::Point2;

use crate::overlay::{OverlayPlan, Primitive};

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub success: Color32,
    pub warning: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(20, 20, 25),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
            success: Color32::from_rgb(76, 175, 80),
            warning: Color32::from_rgb(255, 152, 0),
        }
    }
}

pub fn color32(c: Rgb<u8>) -> Color32 {
    let Rgb([r, g, b]) = c;
    Color32::from_rgb(r, g, b)
}

/// Maps image pixel coordinates onto the screen rectangle the frame is shown in.
#[derive(Debug, Clone, Copy)]
pub struct FrameView {
    rect: Rect,
    scale: Vec2,
}

impl FrameView {
    pub fn new(rect: Rect, image_width: u32, image_height: u32) -> Self {
        let scale = egui::vec2(
            rect.width() / image_width.max(1) as f32,
            rect.height() / image_height.max(1) as f32,
        );
        Self { rect, scale }
    }

    pub fn to_screen(&self, p: Point2<f32>) -> Pos2 {
        self.rect.min + egui::vec2(p.x * self.scale.x, p.y * self.scale.y)
    }

    /// Scale for lengths that are not tied to an axis (radii, strokes, font sizes).
    fn length(&self, l: f32) -> f32 {
        l * self.scale.x.min(self.scale.y)
    }
}

/// Largest rectangle with the image's aspect ratio that fits `available`, centered.
pub fn fit_rect(available: Rect, image_width: u32, image_height: u32) -> Rect {
    let aspect = image_width.max(1) as f32 / image_height.max(1) as f32;
    let mut size = available.size();
    if size.x / size.y > aspect {
        size.x = size.y * aspect;
    } else {
        size.y = size.x / aspect;
    }
    Rect::from_center_size(available.center(), size)
}

pub fn paint_overlay(painter: &egui::Painter, view: &FrameView, plan: &OverlayPlan) {
    for primitive in &plan.primitives {
        match primitive {
            Primitive::FilledRect { min, max, color, alpha } => {
                let Rgb([r, g, b]) = *color;
                let fill = Color32::from_rgba_unmultiplied(r, g, b, (alpha * 255.0).round() as u8);
                painter.rect_filled(Rect::from_two_pos(view.to_screen(*min), view.to_screen(*max)), 0.0, fill);
            }
            Primitive::StrokedRect { min, max, color, thickness } => {
                painter.rect_stroke(
                    Rect::from_two_pos(view.to_screen(*min), view.to_screen(*max)),
                    0.0,
                    Stroke::new(view.length(*thickness), color32(*color)),
                );
            }
            Primitive::Circle { center, radius, color } => {
                painter.circle_filled(view.to_screen(*center), view.length(*radius), color32(*color));
            }
            Primitive::Line { from, to, color, thickness } => {
                painter.line_segment(
                    [view.to_screen(*from), view.to_screen(*to)],
                    Stroke::new(view.length(*thickness), color32(*color)),
                );
            }
            Primitive::Text { origin, text, size, color } => {
                painter.text(
                    view.to_screen(*origin),
                    Align2::LEFT_BOTTOM,
                    text,
                    FontId::proportional(view.length(*size)),
                    color32(*color),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_points_scale_onto_view() {
        let rect = Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(320.0, 240.0));
        let view = FrameView::new(rect, 640, 480);

        assert_eq!(view.to_screen(Point2::new(0.0, 0.0)), egui::pos2(10.0, 20.0));
        assert_eq!(view.to_screen(Point2::new(640.0, 480.0)), egui::pos2(330.0, 260.0));
        assert_eq!(view.length(15.0), 7.5);
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        let close = |a: egui::Vec2, b: egui::Vec2| (a - b).length() < 1e-3;

        let wide = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1000.0, 480.0));
        let fitted = fit_rect(wide, 640, 480);
        assert!(close(fitted.size(), egui::vec2(640.0, 480.0)));
        assert!(close(fitted.center().to_vec2(), wide.center().to_vec2()));

        let tall = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(320.0, 900.0));
        assert!(close(fit_rect(tall, 640, 480).size(), egui::vec2(320.0, 240.0)));
    }
}
