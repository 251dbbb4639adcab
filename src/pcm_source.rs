//! Normalises linear PCM from a WAV container or a raw sample buffer into
//! mono `f32` samples for the streaming transmitter.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::helper::{read_u16_le, read_u32_le};

/// RIFF format tag of linear PCM
const WAVE_FORMAT_PCM: u16 = 1;
/// offset of the sample data in a canonical WAV container
const WAV_DATA_OFFSET: usize = 44;

/// Mono float PCM in [-1, +1] with a known sampling rate.
#[derive(Debug, Clone)]
pub struct PcmSource {
  sample_rate: u32,
  samples: Vec<f32>,
}

impl PcmSource {
  /// read a WAV file from disk
  pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let bytes = std::fs::read(path)?;
    Self::from_wav_bytes(&bytes)
  }

  /// Parse a complete RIFF/WAVE byte buffer. The header is expected at
  /// offset 0 and the sample data at offset 44 (canonical layout).
  pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
    if bytes.len() < 4 || &bytes[..4] != b"RIFF" {
      return Err(Error::NotRiff);
    }
    if bytes.len() < WAV_DATA_OFFSET {
      return Err(Error::TruncatedWave);
    }

    let format = read_u16_le(&bytes[20..]);
    if format != WAVE_FORMAT_PCM {
      return Err(Error::NonPcmFormat);
    }
    let channels = read_u16_le(&bytes[22..]);
    let sample_rate = read_u32_le(&bytes[24..]);
    let bits_per_sample = read_u16_le(&bytes[34..]);

    Self::from_raw(&bytes[WAV_DATA_OFFSET..], sample_rate, bits_per_sample, channels)
  }

  /// Normalise a raw sample buffer with explicit format parameters.
  pub fn from_raw(bytes: &[u8], sample_rate: u32, bits_per_sample: u16, channels: u16) -> Result<Self> {
    if channels == 0 || channels > 2 {
      return Err(Error::UnsupportedChannels(channels));
    }
    if !matches!(bits_per_sample, 8 | 16 | 24 | 32) {
      return Err(Error::UnsupportedBitDepth(bits_per_sample));
    }
    let width = bits_per_sample as usize / 8;
    if bytes.len() % width != 0 {
      return Err(Error::BufferSizeMismatch);
    }

    let mut mono = Vec::with_capacity(bytes.len() / width / channels as usize);
    for frame in bytes.chunks_exact(width * channels as usize) {
      let s = normalised(&frame[..width]);
      if channels == 2 {
        mono.push((s + normalised(&frame[width..])) / 2.0);
      } else {
        mono.push(s);
      }
    }

    debug!("pcm source: {} Hz, {} bit, {} ch, {} samples", sample_rate, bits_per_sample, channels, mono.len());
    Ok(Self {
      sample_rate,
      samples: mono,
    })
  }

  pub fn sample_rate(&self) -> u32 {
    self.sample_rate
  }

  pub fn samples(&self) -> &[f32] {
    &self.samples
  }

  pub fn into_samples(self) -> Vec<f32> {
    self.samples
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }
}

/// One sample rescaled to the 16 bit range and normalised to float.
/// 8 bit data is unsigned offset-128, 24 bit is sign extended at 0x800000,
/// 32 bit is divided down to 16 bit dynamic range.
fn normalised(bytes: &[u8]) -> f32 {
  let s16 = match bytes.len() {
    1 => (bytes[0] as i32 - 128) * 256,
    2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
    3 => {
      let raw = (bytes[0] as u32) | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16;
      // shift the 24 bit value to the top so the sign bit lands at bit 31
      (((raw << 8) as i32) >> 8) / 256
    }
    4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) / 65_538,
    _ => unreachable!(),
  };
  s16 as f32 / 65_530.0
}

#[cfg(test)]
mod tests {
  use super::*;

  fn wav_header(format: u16, channels: u16, sample_rate: u32, bits: u16, data_len: u32) -> Vec<u8> {
    let mut h = Vec::with_capacity(44);
    h.extend_from_slice(b"RIFF");
    h.extend_from_slice(&(36 + data_len).to_le_bytes());
    h.extend_from_slice(b"WAVE");
    h.extend_from_slice(b"fmt ");
    h.extend_from_slice(&16u32.to_le_bytes());
    h.extend_from_slice(&format.to_le_bytes());
    h.extend_from_slice(&channels.to_le_bytes());
    h.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * channels as u32 * bits as u32 / 8;
    h.extend_from_slice(&byte_rate.to_le_bytes());
    h.extend_from_slice(&(channels * bits / 8).to_le_bytes());
    h.extend_from_slice(&bits.to_le_bytes());
    h.extend_from_slice(b"data");
    h.extend_from_slice(&data_len.to_le_bytes());
    h
  }

  #[test]
  fn rejects_garbage() {
    assert!(matches!(PcmSource::from_wav_bytes(b"MP3 junk"), Err(Error::NotRiff)));
    assert!(matches!(PcmSource::from_wav_bytes(b"RIFF"), Err(Error::TruncatedWave)));
  }

  #[test]
  fn rejects_non_pcm() {
    // format tag 3 is IEEE float
    let bytes = wav_header(3, 1, 44_100, 32, 0);
    assert!(matches!(PcmSource::from_wav_bytes(&bytes), Err(Error::NonPcmFormat)));
  }

  #[test]
  fn rejects_bad_format_parameters() {
    assert!(matches!(
      PcmSource::from_raw(&[0; 4], 44_100, 16, 3),
      Err(Error::UnsupportedChannels(3))
    ));
    assert!(matches!(
      PcmSource::from_raw(&[0; 4], 44_100, 12, 1),
      Err(Error::UnsupportedBitDepth(12))
    ));
    assert!(matches!(
      PcmSource::from_raw(&[0; 3], 44_100, 16, 1),
      Err(Error::BufferSizeMismatch)
    ));
  }

  #[test]
  fn normalises_16_bit() {
    let mut bytes = Vec::new();
    for s in [0i16, 16_000, -16_000, i16::MAX, i16::MIN] {
      bytes.extend_from_slice(&s.to_le_bytes());
    }
    let src = PcmSource::from_raw(&bytes, 8_000, 16, 1).unwrap();
    assert_eq!(src.sample_rate(), 8_000);
    assert_eq!(src.len(), 5);
    assert!((src.samples()[0]).abs() < 1e-9);
    assert!((src.samples()[1] - 16_000.0 / 65_530.0).abs() < 1e-6);
    assert!((src.samples()[2] + 16_000.0 / 65_530.0).abs() < 1e-6);
    assert!(src.samples().iter().all(|s| s.abs() <= 1.0));
  }

  #[test]
  fn normalises_8_bit_offset() {
    // 128 is the zero line of unsigned 8 bit PCM
    let src = PcmSource::from_raw(&[128, 255, 0], 8_000, 8, 1).unwrap();
    assert!((src.samples()[0]).abs() < 1e-9);
    assert!(src.samples()[1] > 0.0);
    assert!(src.samples()[2] < 0.0);
  }

  #[test]
  fn normalises_24_bit_sign() {
    let mut bytes = Vec::new();
    // +1 and -1 at full 24 bit scale
    bytes.extend_from_slice(&[0xFF, 0xFF, 0x7F]);
    bytes.extend_from_slice(&[0x00, 0x00, 0x80]);
    let src = PcmSource::from_raw(&bytes, 8_000, 24, 1).unwrap();
    assert!(src.samples()[0] > 0.49);
    assert!(src.samples()[1] < -0.49);
  }

  #[test]
  fn normalises_32_bit() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&i32::MAX.to_le_bytes());
    bytes.extend_from_slice(&i32::MIN.to_le_bytes());
    let src = PcmSource::from_raw(&bytes, 8_000, 32, 1).unwrap();
    assert!(src.samples()[0] > 0.49);
    assert!(src.samples()[1] < -0.49);
  }

  #[test]
  fn stereo_collapses_to_mean() {
    let mut bytes = Vec::new();
    for s in [10_000i16, -10_000, 20_000, 0] {
      bytes.extend_from_slice(&s.to_le_bytes());
    }
    let src = PcmSource::from_raw(&bytes, 8_000, 16, 2).unwrap();
    assert_eq!(src.len(), 2);
    assert!((src.samples()[0]).abs() < 1e-9);
    assert!((src.samples()[1] - 10_000.0 / 65_530.0).abs() < 1e-6);
  }

  #[test]
  fn roundtrips_the_pocsag_wav() {
    let encoded = crate::pocsag::Encoder::new()
      .encode(
        8,
        crate::pocsag::MessageType::Tone,
        b"",
        crate::pocsag::Bps::Bps512,
        crate::pocsag::Charset::Raw,
        crate::pocsag::Function::A,
        false,
      )
      .unwrap();
    let src = PcmSource::from_wav_bytes(&encoded.bytes).unwrap();
    assert_eq!(src.sample_rate(), 44_100);
    assert_eq!(src.len(), encoded.count);
    // the two-level signal never exceeds the configured amplitude
    let peak = 5_000.0 / 65_530.0;
    assert!(src.samples().iter().all(|s| s.abs() <= peak + 1e-6));
  }
}
