/// Decoded multi-channel audio: one `Vec<f32>` of equal length per channel.
///
/// Buffers are never mutated after construction. Every pipeline step takes a buffer by
/// reference or by value and produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Creates a buffer from planar channel data.
    ///
    /// Returns [None] if the sample rate is zero, there are no channels, or the channels
    /// have different lengths.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Option<Self> {
        let frame_count = channels.first()?.len();
        if sample_rate == 0 || channels.iter().any(|c| c.len() != frame_count) {
            return None;
        }

        Some(Self {
            sample_rate,
            channels,
        })
    }

    /// Splits interleaved samples into channels. A trailing partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Option<Self> {
        if channel_count == 0 {
            return None;
        }

        let frame_count = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frame_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames, i.e. samples per channel.
    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Shape of the buffer without its sample data.
    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            sample_rate: self.sample_rate,
            channel_count: self.channel_count(),
            frame_count: self.frame_count(),
        }
    }
}

/// Shape of a buffer the session no longer holds in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub sample_rate: u32,
    pub channel_count: usize,
    pub frame_count: usize,
}

impl BufferInfo {
    pub fn duration(&self) -> f64 {
        self.frame_count as f64 / f64::from(self.sample_rate)
    }
}
