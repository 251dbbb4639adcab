use std::io::Cursor;

use super::PREAMBLE_BYTES;
use crate::error::Result;
use crate::helper::{read_u32_le, reverse_bits_n};

/// expand the low `n` bits of `value` into two-level PCM, transmit order:
/// most significant bit of the reversed value first.
fn push_bits(out: &mut Vec<i16>, value: u32, n: u32, samples_per_bit: usize, amplitude: i16) {
  let rev = reverse_bits_n(value, n);
  for k in (0..n).rev() {
    let sample = if (rev >> k) & 1 == 1 { amplitude } else { -amplitude };
    out.extend(std::iter::repeat(sample).take(samples_per_bit));
  }
}

/// Modulate a framed POCSAG byte stream into signed 16 bit mono PCM:
/// half a second of silence, the preamble byte by byte, the body as
/// little-endian 32 bit codewords, and half a second of trailing silence.
pub(crate) fn modulate(frame: &[u8], bps: u32, sample_rate: u32, amplitude: i16) -> Vec<i16> {
  let samples_per_bit = (sample_rate / bps) as usize;
  let silence = (sample_rate / 2) as usize;

  let mut out = Vec::with_capacity(2 * silence + frame.len() * 8 * samples_per_bit);
  out.extend(std::iter::repeat(0i16).take(silence));

  for &byte in &frame[..PREAMBLE_BYTES] {
    push_bits(&mut out, byte as u32, 8, samples_per_bit, amplitude);
  }
  for group in frame[PREAMBLE_BYTES..].chunks_exact(4) {
    push_bits(&mut out, read_u32_le(group), 32, samples_per_bit, amplitude);
  }

  out.extend(std::iter::repeat(0i16).take(silence));
  out
}

/// wrap PCM samples into a canonical 44 byte RIFF/WAVE mono PCM16 container.
pub(crate) fn wrap_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
  let spec = hound::WavSpec {
    channels: 1,
    sample_rate,
    bits_per_sample: 16,
    sample_format: hound::SampleFormat::Int,
  };

  let mut cursor = Cursor::new(Vec::new());
  let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
  for &sample in samples {
    writer.write_sample(sample)?;
  }
  writer.finalize()?;

  Ok(cursor.into_inner())
}
