//! Error types shared by the editing pipeline.
//!
//! Every error here is recoverable: the session returns it to the caller and leaves its
//! buffer, regions and current resource exactly as they were before the call.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::wav::WavError;

/// Errors returned by [crate::session::EditSession] operations.
#[derive(Error, Debug)]
pub enum EditError {
    /// Selection is empty or inverted, rebasing produced an out-of-range interval, or the
    /// region shape does not match its kind.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// File extension is not one of `mp3`, `wav`, `ogg`. Rejected before decoding.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The decode service could not parse the source bytes.
    #[error("decode failed: {0}")]
    DecodeFailed(#[from] DecodeError),

    /// A decode or trim is already in flight.
    #[error("another operation is in progress")]
    Busy,

    /// The operation needs a loaded recording.
    #[error("no audio loaded")]
    NoSource,

    /// Reading a source file or writing an export failed.
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The trimmed buffer cannot be represented in the output container.
    #[error("encode failed: {0}")]
    Encode(#[from] WavError),
}

impl EditError {
    /// Short message suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            EditError::InvalidRegion(_) => {
                "Invalid region selected. End time must be greater than start time."
            }
            EditError::UnsupportedFormat(_) => {
                "Unsupported file format. Please upload an MP3, WAV, or OGG file."
            }
            EditError::DecodeFailed(_) => "Could not decode the audio file.",
            EditError::Busy => "Please wait, the audio is still being processed.",
            EditError::NoSource => "Open an audio file first.",
            EditError::Io(_) => "Could not read or write the file.",
            EditError::Encode(_) => "The trimmed audio is too large to save as WAV.",
        }
    }
}

/// Convenience Result type for editing operations.
pub type Result<T> = std::result::Result<T, EditError>;
