//! Byte-level checks of the encoded container, read back with hound as an independent
//! WAV parser.

use std::io::Cursor;
use std::sync::Arc;

use audio_cutter::{wav, AudioBuffer, DecodeService, RodioDecodeService, SourceFormat};

fn stereo_scenario() -> AudioBuffer {
    AudioBuffer::new(
        2,
        vec![vec![0.1, 0.2, 0.3, 0.4], vec![-0.1, -0.2, -0.3, -0.4]],
    )
    .unwrap()
}

#[test]
fn stereo_samples_are_interleaved_and_quantized() {
    let bytes = wav::encode(&stereo_scenario()).unwrap();

    // Non-negative samples scale by 32767, negative by 32768, truncated toward zero.
    let expected: [i16; 8] = [3276, -3276, 6553, -6553, 9830, -9830, 13106, -13107];

    let data: Vec<i16> = bytes[44..]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(data, expected);

    let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 2);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(reader.duration(), 4);

    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, expected);
}

#[test]
fn header_matches_layout() {
    let bytes = wav::encode(&stereo_scenario()).unwrap();
    let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
    let u32_at = |offset: usize| {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    };

    assert_eq!(bytes.len(), 44 + 16);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32_at(4), bytes.len() as u32 - 8);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(u32_at(16), 16);
    assert_eq!(u16_at(20), 1);
    assert_eq!(u16_at(22), 2);
    assert_eq!(u32_at(24), 2);
    assert_eq!(u32_at(28), 2 * 2 * 2);
    assert_eq!(u16_at(32), 4);
    assert_eq!(u16_at(34), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(u32_at(40), 16);
}

#[test]
fn encoding_is_deterministic_and_clamps() {
    let buffer = AudioBuffer::new(8000, vec![vec![1.5, -1.5, f32::MAX, -0.0]]).unwrap();
    let first = wav::encode(&buffer).unwrap();
    assert_eq!(first, wav::encode(&buffer).unwrap());

    let data: Vec<i16> = first[44..]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(data, [32767, -32768, 32767, 0]);
}

#[test]
fn rodio_reads_encoded_output() {
    let left: Vec<f32> = (0..800).map(|i| (i as f32 / 800.0) - 0.5).collect();
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    let buffer = AudioBuffer::new(8000, vec![left, right]).unwrap();
    let bytes: Arc<[u8]> = wav::encode(&buffer).unwrap().into();

    // Declared as mp3 so the canonical fast path is skipped and rodio probes the data.
    let decoded = RodioDecodeService.decode(bytes, SourceFormat::Mp3).unwrap();

    assert_eq!(decoded.sample_rate(), 8000);
    assert_eq!(decoded.channel_count(), 2);
    assert_eq!(decoded.frame_count(), 800);
    for (channel, original) in decoded.channels().iter().zip(buffer.channels()) {
        for (a, b) in channel.iter().zip(original) {
            assert!((a - b).abs() <= 2.0 / 32768.0, "{a} vs {b}");
        }
    }
}
