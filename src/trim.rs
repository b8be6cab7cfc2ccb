//! Sample-accurate outer and inner trim.

use tracing::debug;

use crate::buffer::AudioBuffer;
use crate::error::{EditError, Result};
use crate::time_base::TrimInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Keep only the selected interval.
    Outer,
    /// Remove the selected interval and splice the remainder together.
    Inner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSpec {
    pub start: f64,
    pub end: f64,
    pub mode: TrimMode,
}

impl TrimSpec {
    pub fn new(interval: TrimInterval, mode: TrimMode) -> Self {
        Self {
            start: interval.start,
            end: interval.end,
            mode,
        }
    }

    /// Frame range `[start_frame, end_frame)` of this spec within `buffer`.
    ///
    /// Both offsets are `floor(seconds * sample_rate)` clamped to the buffer length.
    pub fn frame_range(&self, buffer: &AudioBuffer) -> Result<(usize, usize)> {
        let rate = f64::from(buffer.sample_rate());
        let frames = buffer.frame_count();
        let start_frame = seconds_to_frame(self.start, rate, frames);
        let end_frame = seconds_to_frame(self.end, rate, frames);

        if end_frame <= start_frame {
            return Err(EditError::InvalidRegion(format!(
                "{}..{} s covers no frames at {} Hz",
                self.start, self.end, buffer.sample_rate()
            )));
        }
        Ok((start_frame, end_frame))
    }
}

fn seconds_to_frame(seconds: f64, rate: f64, frames: usize) -> usize {
    let frame = (seconds * rate).floor();
    if frame <= 0.0 {
        0
    } else if frame >= frames as f64 {
        frames
    } else {
        frame as usize
    }
}

/// Produces a new buffer from `source` according to `spec`.
///
/// Samples are copied verbatim; sample rate and channel count are unchanged.
pub fn trim(source: &AudioBuffer, spec: &TrimSpec) -> Result<AudioBuffer> {
    let (start_frame, end_frame) = spec.frame_range(source)?;

    let channels: Vec<Vec<f32>> = match spec.mode {
        TrimMode::Outer => source
            .channels()
            .iter()
            .map(|channel| channel[start_frame..end_frame].to_vec())
            .collect(),
        TrimMode::Inner => source
            .channels()
            .iter()
            .map(|channel| {
                let mut spliced = Vec::with_capacity(start_frame + channel.len() - end_frame);
                spliced.extend_from_slice(&channel[..start_frame]);
                spliced.extend_from_slice(&channel[end_frame..]);
                spliced
            })
            .collect(),
    };

    debug!(
        mode = ?spec.mode,
        start_frame,
        end_frame,
        source_frames = source.frame_count(),
        "trimmed buffer"
    );

    AudioBuffer::new(source.sample_rate(), channels)
        .ok_or_else(|| EditError::InvalidRegion("trim produced a malformed buffer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 s mono at 8 Hz; sample value equals its frame index.
    fn ramp() -> AudioBuffer {
        AudioBuffer::new(8, vec![(0..80).map(|i| i as f32).collect()]).unwrap()
    }

    fn spec(start: f64, end: f64, mode: TrimMode) -> TrimSpec {
        TrimSpec { start, end, mode }
    }

    #[test]
    fn outer_trim_keeps_selection() {
        let trimmed = trim(&ramp(), &spec(2.0, 4.0, TrimMode::Outer)).unwrap();
        assert_eq!(trimmed.frame_count(), 16);
        assert_eq!(trimmed.duration(), 2.0);
        assert_eq!(trimmed.channel(0)[0], 16.0);
        assert_eq!(trimmed.channel(0)[15], 31.0);
    }

    #[test]
    fn inner_trim_splices_remainder() {
        let trimmed = trim(&ramp(), &spec(2.0, 4.0, TrimMode::Inner)).unwrap();
        assert_eq!(trimmed.frame_count(), 64);
        assert_eq!(trimmed.duration(), 8.0);
        assert_eq!(trimmed.channel(0)[15], 15.0);
        // First sample after the gap.
        assert_eq!(trimmed.channel(0)[16], 32.0);
    }

    #[test]
    fn frame_counts_follow_floor_rule() {
        let source = AudioBuffer::new(44100, vec![vec![0.0; 441_000]; 2]).unwrap();
        let cases = [(0.0, 10.0), (1.23456, 7.891), (0.00001, 0.00003), (9.99999, 10.0)];
        for (start, end) in cases {
            let start_frame = (start * 44100.0_f64).floor() as usize;
            let end_frame = (end * 44100.0_f64).floor() as usize;

            let outer = trim(&source, &spec(start, end, TrimMode::Outer));
            let inner = trim(&source, &spec(start, end, TrimMode::Inner));
            if end_frame <= start_frame {
                assert!(matches!(outer, Err(EditError::InvalidRegion(_))));
                assert!(matches!(inner, Err(EditError::InvalidRegion(_))));
                continue;
            }

            let outer = outer.unwrap();
            let inner = inner.unwrap();
            assert_eq!(outer.frame_count(), end_frame - start_frame);
            assert_eq!(inner.frame_count(), start_frame + (441_000 - end_frame));
            assert_eq!(outer.channel_count(), 2);
            assert_eq!(inner.sample_rate(), 44100);
        }
    }

    #[test]
    fn outer_trim_of_full_range_is_identity() {
        let once = trim(&ramp(), &spec(2.0, 4.0, TrimMode::Outer)).unwrap();
        let twice = trim(&once, &spec(0.0, once.duration(), TrimMode::Outer)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn sub_frame_selection_is_rejected() {
        // Both ends floor to frame 16.
        let result = trim(&ramp(), &spec(2.0, 2.1, TrimMode::Outer));
        assert!(matches!(result, Err(EditError::InvalidRegion(_))));
    }

    #[test]
    fn bounds_are_clamped_to_buffer() {
        let trimmed = trim(&ramp(), &spec(-1.0, 20.0, TrimMode::Inner)).unwrap();
        assert_eq!(trimmed.frame_count(), 0);
    }

    #[test]
    fn channels_are_trimmed_independently() {
        let source = AudioBuffer::new(
            4,
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![-1.0, -2.0, -3.0, -4.0]],
        )
        .unwrap();
        let trimmed = trim(&source, &spec(0.25, 0.75, TrimMode::Inner)).unwrap();
        assert_eq!(trimmed.channel(0), &[1.0, 4.0]);
        assert_eq!(trimmed.channel(1), &[-1.0, -4.0]);
    }
}
