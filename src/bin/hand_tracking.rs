// Landmark preview: draws the detected hands and logs the thumb tip position.
use anyhow::Context;
use hand_volume::app::{self, AppMode};
use hand_volume::config::Settings;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::load().context("Failed to load settings")?;

    app::run(AppMode::HandTracking, settings)
}
