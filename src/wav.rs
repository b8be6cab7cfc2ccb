//! Canonical 16-bit PCM WAV container.
//!
//! Layout, all integers little-endian:
//!
//! | offset | field |
//! |---|---|
//! | 0 | `"RIFF"` |
//! | 4 | total length - 8 (u32) |
//! | 8 | `"WAVE"` |
//! | 12 | `"fmt "` |
//! | 16 | 16 (u32, fmt chunk size) |
//! | 20 | 1 (u16, PCM) |
//! | 22 | channel count (u16) |
//! | 24 | sample rate (u32) |
//! | 28 | byte rate = sample rate * channels * 2 (u32) |
//! | 32 | block align = channels * 2 (u16) |
//! | 34 | 16 (u16, bits per sample) |
//! | 36 | `"data"` |
//! | 40 | data size = frames * channels * 2 (u32) |
//! | 44 | interleaved i16 samples |

use hound::{SampleFormat, WavReader};
use thiserror::Error;

use crate::buffer::AudioBuffer;

pub const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: usize = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WavError {
    #[error("buffer too large for a WAV container: {0}")]
    TooLarge(String),

    #[error("not a canonical 16-bit PCM WAV: {0}")]
    NotCanonical(&'static str),

    #[error("unreadable WAV container: {0}")]
    Unreadable(String),
}

/// Quantizes one sample: clamp to `[-1, 1]`, scale negatives by 32768 and the rest by
/// 32767, truncate toward zero.
///
/// The product is taken in f64, where it is exact for every f32 input.
pub fn quantize(sample: f32) -> i16 {
    let sample = f64::from(sample).clamp(-1.0, 1.0);
    if sample < 0.0 {
        (sample * 32768.0) as i16
    } else {
        (sample * 32767.0) as i16
    }
}

/// Inverse of [quantize]: `quantize(dequantize(v)) == v` for every `v`.
///
/// Non-negative values map to the smallest f32 whose exact product with 32767 reaches
/// `v`.
pub fn dequantize(value: i16) -> f32 {
    if value < 0 {
        return f32::from(value) / 32768.0;
    }

    let target = f64::from(value);
    let reaches = |sample: f32| f64::from(sample) * 32767.0 >= target;

    let mut sample = (target / 32767.0) as f32;
    while !reaches(sample) {
        sample = f32::from_bits(sample.to_bits() + 1);
    }
    while sample > 0.0 && reaches(f32::from_bits(sample.to_bits() - 1)) {
        sample = f32::from_bits(sample.to_bits() - 1);
    }
    sample
}

/// Serializes `buffer` into the canonical container.
pub fn encode(buffer: &AudioBuffer) -> Result<Vec<u8>, WavError> {
    let channel_count = u16::try_from(buffer.channel_count())
        .map_err(|_| WavError::TooLarge(format!("{} channels", buffer.channel_count())))?;
    let block_align = usize::from(channel_count) * BYTES_PER_SAMPLE;
    let data_size = buffer
        .frame_count()
        .checked_mul(block_align)
        .filter(|size| *size <= u32::MAX as usize - HEADER_LEN)
        .ok_or_else(|| {
            WavError::TooLarge(format!(
                "{} frames x {} channels",
                buffer.frame_count(),
                channel_count
            ))
        })?;
    let byte_rate = buffer
        .sample_rate()
        .checked_mul(block_align as u32)
        .ok_or_else(|| WavError::TooLarge(format!("sample rate {}", buffer.sample_rate())))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + data_size);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&((HEADER_LEN + data_size - 8) as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channel_count.to_le_bytes());
    bytes.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&(block_align as u16).to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(data_size as u32).to_le_bytes());

    for frame in 0..buffer.frame_count() {
        for channel in buffer.channels() {
            bytes.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    Ok(bytes)
}

/// Parses a container written by [encode].
///
/// Anything else, including valid WAV files with extra chunks or other sample formats,
/// is rejected so the caller can hand it to a general-purpose decoder.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer, WavError> {
    let mut reader =
        WavReader::new(bytes).map_err(|error| WavError::Unreadable(error.to_string()))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(WavError::NotCanonical("not 16-bit PCM"));
    }

    let sample_count = reader.len() as usize;
    if bytes.len() != HEADER_LEN + sample_count * BYTES_PER_SAMPLE {
        return Err(WavError::NotCanonical("extra chunks or extended fmt header"));
    }

    let samples = reader
        .samples::<i16>()
        .map(|sample| sample.map(dequantize))
        .collect::<Result<Vec<f32>, _>>()
        .map_err(|error| WavError::Unreadable(error.to_string()))?;

    AudioBuffer::from_interleaved(spec.sample_rate, usize::from(spec.channels), &samples)
        .ok_or(WavError::NotCanonical("malformed sample data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn quantization_rule() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(2.5), 32767);
        assert_eq!(quantize(-7.0), -32768);
        assert_eq!(quantize(0.0), 0);
        // Truncation toward zero on both sides.
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
        assert_eq!(quantize(-0.00001), 0);
    }

    #[test]
    fn truncates_the_exact_product() {
        // 3.051851e-5 * 32767 is just below 1 but rounds to 1.0 in f32.
        assert_eq!(quantize(3.051851e-5), 0);
        assert_eq!(quantize(f32::from_bits(3.051851e-5_f32.to_bits() + 1)), 1);

        // Every f32 around a few grid points against integer arithmetic on the exact
        // binary value: x = m * 2^e, so trunc(x * 32767) = (m * 32767) >> -e.
        for value in [1i64, 2, 100, 12345, 32766] {
            let center = (value as f32 / 32767.0).to_bits();
            for bits in center - 64..center + 64 {
                let sample = f32::from_bits(bits);
                let (mantissa, exponent) = decompose(sample);
                let expected = (mantissa * 32767) >> -exponent;
                assert_eq!(i64::from(quantize(sample)), expected, "sample {sample:e}");
            }
        }
    }

    /// Splits a positive normal f32 into `mantissa * 2^exponent`.
    fn decompose(sample: f32) -> (i64, i32) {
        let bits = sample.to_bits();
        let exponent = ((bits >> 23) & 0xff) as i32 - 127 - 23;
        let mantissa = i64::from((bits & 0x7f_ffff) | 0x80_0000);
        (mantissa, exponent)
    }

    #[test]
    fn dequantize_round_trips_every_value() {
        for value in i16::MIN..=i16::MAX {
            let sample = dequantize(value);
            assert_eq!(quantize(sample), value);
            if value > 0 {
                let below = f32::from_bits(sample.to_bits() - 1);
                assert_eq!(quantize(below), value - 1, "{value} is not the smallest");
            }
        }
    }

    #[test]
    fn header_fields() {
        let buffer = AudioBuffer::new(44100, vec![vec![0.0; 10]; 2]).unwrap();
        let bytes = encode(&buffer).unwrap();

        assert_eq!(bytes.len(), 44 + 40);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(read_u32(&bytes, 4), 76);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(read_u32(&bytes, 16), 16);
        assert_eq!(read_u16(&bytes, 20), 1);
        assert_eq!(read_u16(&bytes, 22), 2);
        assert_eq!(read_u32(&bytes, 24), 44100);
        assert_eq!(read_u32(&bytes, 28), 176_400);
        assert_eq!(read_u16(&bytes, 32), 4);
        assert_eq!(read_u16(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(read_u32(&bytes, 40), 40);
    }

    #[test]
    fn empty_buffer_is_header_only() {
        let buffer = AudioBuffer::new(8000, vec![vec![]]).unwrap();
        let bytes = encode(&buffer).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(decode(&bytes).unwrap().frame_count(), 0);
    }

    #[test]
    fn decode_inverts_encode_on_grid() {
        let left: Vec<f32> = [-32768i16, -1, 0, 1, 12345, 32767]
            .into_iter()
            .map(dequantize)
            .collect();
        let right: Vec<f32> = left.iter().rev().copied().collect();
        let buffer = AudioBuffer::new(22050, vec![left, right]).unwrap();

        let bytes = encode(&buffer).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, buffer);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn decode_rejects_foreign_layouts() {
        let buffer = AudioBuffer::new(8000, vec![vec![0.25; 4]]).unwrap();
        let bytes = encode(&buffer).unwrap();

        assert!(decode(&bytes[..HEADER_LEN - 1]).is_err());
        assert!(decode(b"ID3\x03 not a wav file at all, just some mp3 bytes....").is_err());

        let mut truncated = bytes.clone();
        truncated.pop();
        assert!(decode(&truncated).is_err());

        let mut float_format = bytes.clone();
        float_format[20] = 3;
        assert!(decode(&float_format).is_err());

        // A valid WAV with a LIST chunk before the data is not the canonical layout.
        let mut with_list = bytes[..36].to_vec();
        with_list.extend_from_slice(b"LIST");
        with_list.extend_from_slice(&4u32.to_le_bytes());
        with_list.extend_from_slice(b"INFO");
        with_list.extend_from_slice(&bytes[36..]);
        let riff_len = (with_list.len() - 8) as u32;
        with_list[4..8].copy_from_slice(&riff_len.to_le_bytes());
        assert_eq!(
            decode(&with_list),
            Err(WavError::NotCanonical("extra chunks or extended fmt header"))
        );
    }

    #[test]
    fn decode_rejects_eight_bit_pcm() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for sample in [0i8, 10, -10, 100] {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        assert_eq!(
            decode(cursor.get_ref()),
            Err(WavError::NotCanonical("not 16-bit PCM"))
        );
    }
}
