// src/main.rs
use anyhow::Context;
use hand_volume::app::{self, AppMode};
use hand_volume::config::Settings;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Ok(p) = std::env::current_exe() {
        tracing::debug!("Running from: {}", p.display());
    }

    let settings = Settings::load().context("Failed to load settings")?;
    app::run(AppMode::VolumeControl, settings)
}
