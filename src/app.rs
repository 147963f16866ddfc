// src/app.rs
use std::time::Instant;

use anyhow::{Context, Result};
use eframe::egui;
use image::RgbImage;
use tracing::{error, info, warn};

use crate::audio::{open_endpoint, AudioBackend, VolumeController};
use crate::config::Settings;
use crate::hand::{HandDetector, HandLandmarker, SimulatedLandmarker, THUMB_TIP};
use crate::mediapipe_bridge::MediaPipeWrapper;
use crate::overlay::{self, OverlayPlan, OverlayStyle};
use crate::pipeline::{FrameProcessor, FrameReport};
use crate::ui::{fit_rect, paint_overlay, FrameView, Theme};
use crate::video::{self, VideoSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Pinch distance drives the output volume.
    VolumeControl,
    /// Landmark preview only.
    HandTracking,
}

impl AppMode {
    pub fn title(&self) -> &'static str {
        match self {
            AppMode::VolumeControl => "Hand Tracking Volume Control",
            AppMode::HandTracking => "Hand Tracking",
        }
    }

    fn overlay_style(&self, settings: &Settings) -> OverlayStyle {
        match self {
            AppMode::VolumeControl => OverlayStyle {
                gauge: settings.gauge,
                draw_hands: settings.draw_hands,
                draw_positions: settings.draw_positions,
                show_gauge: true,
            },
            AppMode::HandTracking => OverlayStyle {
                gauge: settings.gauge,
                draw_hands: true,
                draw_positions: true,
                show_gauge: false,
            },
        }
    }
}

/// Backend to open. The simulated hand only ever gets the dry-run endpoint.
pub fn audio_backend(settings: &Settings) -> AudioBackend {
    if settings.landmarker_command.is_none() && settings.audio_backend != AudioBackend::DryRun {
        warn!(
            "Simulated hand in use, ignoring audio_backend {:?}; volume changes will only be logged",
            settings.audio_backend
        );
        return AudioBackend::DryRun;
    }
    settings.audio_backend
}

pub fn build_processor(mode: AppMode, settings: &Settings) -> Result<FrameProcessor> {
    let landmarker: Box<dyn HandLandmarker> = match &settings.landmarker_command {
        Some(command) => Box::new(MediaPipeWrapper::spawn(command).context("Failed to start hand landmarker")?),
        None => {
            warn!("No landmarker_command configured, using a simulated hand");
            Box::new(SimulatedLandmarker::default())
        }
    };

    let detector = HandDetector::new(settings.detector, landmarker).context("Failed to initialize hand detector")?;
    info!(
        "Hand detection through {} (up to {} hand(s))",
        detector.landmarker_name(),
        detector.options().max_num_hands
    );

    Ok(match mode {
        AppMode::VolumeControl => {
            let endpoint = open_endpoint(audio_backend(settings)).context("Failed to open audio endpoint")?;
            let controller = VolumeController::new(endpoint)?;
            FrameProcessor::with_volume(detector, controller, settings.calibration, settings.gauge)
        }
        AppMode::HandTracking => FrameProcessor::tracking_only(detector),
    })
}

pub fn run(mode: AppMode, settings: Settings) -> Result<()> {
    settings.validate()?;
    video::list_cameras();

    let video_source = VideoSource::open(settings.camera_index, settings.mirror)?;
    let processor = build_processor(mode, &settings)?;
    let app = HandApp::new(mode, video_source, processor, &settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(mode.title())
            .with_inner_size([960.0, 760.0])
            .with_min_inner_size([480.0, 400.0]),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        mode.title(),
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow::anyhow!("Error running application: {}", e))
}

pub struct HandApp {
    mode: AppMode,
    video_source: VideoSource,
    processor: FrameProcessor,
    style: OverlayStyle,
    theme: Theme,

    texture: Option<egui::TextureHandle>,
    frame_size: (u32, u32),
    report: FrameReport,
    plan: OverlayPlan,
    stopped: bool,
}

impl HandApp {
    pub fn new(mode: AppMode, video_source: VideoSource, processor: FrameProcessor, settings: &Settings) -> Self {
        Self {
            mode,
            video_source,
            processor,
            style: mode.overlay_style(settings),
            theme: Theme::default(),
            texture: None,
            frame_size: (0, 0),
            report: FrameReport::default(),
            plan: OverlayPlan::default(),
            stopped: false,
        }
    }

    fn step(&mut self, ctx: &egui::Context) {
        let frame = match self.video_source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Camera {}: {}; stopping", self.video_source.index(), e);
                self.stopped = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
        };

        let report = self.processor.process(&frame, Instant::now());
        if self.mode == AppMode::HandTracking {
            if let Some(tip) = report.landmarks.get(THUMB_TIP) {
                info!("{:?}", tip);
            }
        }

        self.plan = overlay::plan(&report, &self.style);
        self.report = report;
        self.upload(ctx, &frame);
    }

    fn upload(&mut self, ctx: &egui::Context, frame: &RgbImage) {
        let (w, h) = frame.dimensions();
        let image = egui::ColorImage::from_rgb([w as usize, h as usize], frame.as_raw());

        match self.texture.as_mut() {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("camera-frame", image, egui::TextureOptions::LINEAR)),
        }
        self.frame_size = (w, h);
    }

    fn render_status(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.report.landmarks.is_empty() {
                    ui.colored_label(self.theme.warning, "No hand");
                } else {
                    ui.colored_label(self.theme.success, format!("{} hand(s)", self.report.hands.len()));
                }

                if let Some(reading) = &self.report.reading {
                    ui.separator();
                    ui.colored_label(
                        self.theme.text_primary,
                        format!("Volume {} ({:.0}px)", reading.percent_label(), reading.distance),
                    );
                }

                ui.separator();
                if self.processor.detection_failures() > 0 {
                    ui.colored_label(
                        self.theme.warning,
                        format!("Model {} failing", self.processor.detector().landmarker_name()),
                    );
                } else {
                    ui.colored_label(
                        self.theme.text_secondary,
                        format!("Model: {}", self.processor.detector().landmarker_name()),
                    );
                }

                if let Some(endpoint) = self.processor.audio_endpoint() {
                    ui.separator();
                    ui.colored_label(self.theme.text_secondary, format!("Audio: {}", endpoint));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(self.theme.text_secondary, "Press Q to quit");
                });
            });
        });
    }

    fn render_frame(&self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.background))
            .show(ctx, |ui| {
                let Some(texture) = self.texture.as_ref() else {
                    ui.centered_and_justified(|ui| {
                        ui.label("Waiting for camera...");
                    });
                    return;
                };

                let (w, h) = self.frame_size;
                let rect = fit_rect(ui.available_rect_before_wrap(), w, h);
                let painter = ui.painter_at(rect);
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

                painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
                paint_overlay(&painter, &FrameView::new(rect, w, h), &self.plan);
            });
    }
}

impl eframe::App for HandApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Q) || i.key_pressed(egui::Key::Escape)) {
            info!("Quit requested");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        if !self.stopped {
            self.step(ctx);
        }

        self.render_status(ctx);
        self.render_frame(ctx);

        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn simulated_hand_never_opens_a_real_mixer() {
        for backend in [AudioBackend::Auto, AudioBackend::Pactl, AudioBackend::Osascript, AudioBackend::Wasapi] {
            let settings = Settings {
                audio_backend: backend,
                ..Settings::default()
            };
            assert_eq!(audio_backend(&settings), AudioBackend::DryRun);
        }
    }

    #[test]
    fn default_settings_only_log_volume_changes() {
        let mut processor = build_processor(AppMode::VolumeControl, &Settings::default()).unwrap();
        assert_eq!(processor.detector().landmarker_name(), "simulation");
        assert_eq!(processor.audio_endpoint(), Some("dry-run"));

        let frame = RgbImage::new(640, 480);
        let t0 = Instant::now();
        for i in 0..300 {
            processor.process(&frame, t0 + Duration::from_millis(33 * i));
        }
        assert_eq!(processor.audio_endpoint(), Some("dry-run"));
    }

    #[test]
    fn configured_landmarker_keeps_chosen_backend() {
        let settings = Settings {
            landmarker_command: Some(vec!["helper".to_string()]),
            audio_backend: AudioBackend::Pactl,
            ..Settings::default()
        };
        assert_eq!(audio_backend(&settings), AudioBackend::Pactl);
    }

    #[test]
    fn tracking_mode_has_no_audio() {
        let processor = build_processor(AppMode::HandTracking, &Settings::default()).unwrap();
        assert_eq!(processor.audio_endpoint(), None);
    }
}
