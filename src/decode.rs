//! Source files and the service that turns their bytes into [AudioBuffer]s.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rodio::Source;
use thiserror::Error;
use tracing::debug;

use crate::buffer::AudioBuffer;
use crate::error::{EditError, Result};
use crate::wav;

/// Containers accepted as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Mp3,
    Wav,
    Ogg,
}

impl SourceFormat {
    /// Case-insensitive lookup of a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "mp3" => Some(SourceFormat::Mp3),
            "wav" => Some(SourceFormat::Wav),
            "ogg" => Some(SourceFormat::Ogg),
            _ => None,
        }
    }

    /// Format of a file name, judged by its extension only.
    ///
    /// # Errors
    ///
    /// [EditError::UnsupportedFormat] for missing or unknown extensions.
    pub fn from_file_name(name: &str) -> Result<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| EditError::UnsupportedFormat(name.to_string()))
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Mp3 => "mp3",
            SourceFormat::Wav => "wav",
            SourceFormat::Ogg => "ogg",
        };
        f.write_str(name)
    }
}

/// A file picked by the user, read fully into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads `path` from disk. The extension is checked before the file is read.
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        SourceFormat::from_file_name(&name)?;

        let bytes = std::fs::read(path)?;
        Ok(Self { name, bytes })
    }

    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::from_file_name(&self.name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{format} decoder rejected the data: {reason}")]
    Malformed { format: SourceFormat, reason: String },

    #[error("{0} stream contains no audio")]
    Empty(SourceFormat),

    #[error("decode worker has stopped")]
    WorkerStopped,
}

/// Decodes encoded audio into planar samples.
///
/// Implementations run on the decode worker thread, so they must be [Send].
pub trait DecodeService: Send {
    fn decode(
        &self,
        bytes: Arc<[u8]>,
        format: SourceFormat,
    ) -> std::result::Result<AudioBuffer, DecodeError>;
}

/// Decoder backed by rodio, with a lossless fast path for containers written by
/// [wav::encode].
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioDecodeService;

impl DecodeService for RodioDecodeService {
    fn decode(
        &self,
        bytes: Arc<[u8]>,
        format: SourceFormat,
    ) -> std::result::Result<AudioBuffer, DecodeError> {
        if format == SourceFormat::Wav {
            if let Ok(buffer) = wav::decode(&bytes) {
                debug!(frames = buffer.frame_count(), "decoded canonical WAV");
                return Ok(buffer);
            }
        }

        let decoder =
            rodio::Decoder::new(Cursor::new(bytes)).map_err(|e| DecodeError::Malformed {
                format,
                reason: e.to_string(),
            })?;

        let channel_count = usize::from(u16::from(decoder.channels()));
        let sample_rate = u32::from(decoder.sample_rate());
        let samples: Vec<f32> = decoder.collect();

        debug!(
            %format,
            channel_count,
            sample_rate,
            samples = samples.len(),
            "decoded with rodio"
        );

        if samples.is_empty() {
            return Err(DecodeError::Empty(format));
        }

        AudioBuffer::from_interleaved(sample_rate, channel_count, &samples).ok_or_else(|| {
            DecodeError::Malformed {
                format,
                reason: format!("{channel_count} channels at {sample_rate} Hz"),
            }
        })
    }
}
