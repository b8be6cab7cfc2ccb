use audio_cutter::audio_cutter_app::AudioCutterApp;
use audio_cutter::config::{Args, CutterConfig};
use clap::Parser;
use eframe::egui;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eframe::Result {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CutterConfig::from(&args);
    info!(?config, "starting Audio Cutter");

    let window_options = eframe::NativeOptions {
        // Viewport is an area in which the objects are going to be rendered (i.e. native window)
        viewport: egui::ViewportBuilder::default()
            .with_min_inner_size([640.0, 320.0])
            .with_inner_size([640.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Audio Cutter",
        window_options,
        Box::new(|cc| Ok(Box::new(AudioCutterApp::new(cc, config)?))),
    )
}
