//! Command-line configuration of the desktop application.

use std::path::PathBuf;

use clap::Parser;

use crate::session::DEFAULT_EXPORT_NAME;

/// Command-line arguments for audio-cutter
#[derive(Parser, Debug)]
#[command(name = "audio-cutter")]
#[command(about = "Select a range of an audio file and cut it")]
#[command(version)]
pub struct Args {
    /// Audio file (mp3, wav or ogg) to open on startup
    pub file: Option<PathBuf>,

    /// File name offered when saving the edited audio
    #[arg(long, default_value = DEFAULT_EXPORT_NAME, env = "AUDIO_CUTTER_EXPORT_NAME")]
    pub export_name: String,

    /// Log filter, e.g. "audio_cutter=debug". `RUST_LOG` takes precedence.
    #[arg(long, default_value = "audio_cutter=info", env = "AUDIO_CUTTER_LOG")]
    pub log: String,
}

/// Settings consumed by [crate::audio_cutter_app::AudioCutterApp].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutterConfig {
    pub initial_file: Option<PathBuf>,
    pub export_name: String,
}

impl Default for CutterConfig {
    fn default() -> Self {
        Self {
            initial_file: None,
            export_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

impl From<&Args> for CutterConfig {
    fn from(args: &Args) -> Self {
        Self {
            initial_file: args.file.clone(),
            export_name: args.export_name.clone(),
        }
    }
}
