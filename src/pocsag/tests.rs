use std::io::Cursor;

use super::charset::{numeric_value, recode};
use super::codeword::{address_codeword, alphanumeric_bits, message_codeword, numeric_bits};
use super::encoder::{Bps, DateTimePosition, Encoder, Function, MessageType};
use super::modulate::{modulate, wrap_wav};
use super::{Charset, IDLE_CODEWORD, PREAMBLE_BYTES};
use crate::helper::{bytes_to_bits, is_signed, reverse_bits_n, sign_codeword};

#[test]
fn numeric_mapping() {
  assert_eq!(numeric_value(b'0').unwrap(), 0x0);
  assert_eq!(numeric_value(b'9').unwrap(), 0x9);
  assert_eq!(numeric_value(b'*').unwrap(), 0xA);
  assert_eq!(numeric_value(b'U').unwrap(), 0xB);
  assert_eq!(numeric_value(b'u').unwrap(), 0xB);
  assert_eq!(numeric_value(b' ').unwrap(), 0xC);
  assert_eq!(numeric_value(b'\n').unwrap(), 0xC);
  assert_eq!(numeric_value(b'-').unwrap(), 0xD);
  assert_eq!(numeric_value(b')').unwrap(), 0xE);
  assert_eq!(numeric_value(b']').unwrap(), 0xE);
  assert_eq!(numeric_value(b'(').unwrap(), 0xF);
  assert_eq!(numeric_value(b'[').unwrap(), 0xF);
  assert!(numeric_value(b'x').is_err());
}

#[test]
fn latin_substitutions() {
  assert_eq!(recode(b"abc", Charset::Latin), b"abc");
  assert_eq!(recode(b"]", Charset::Latin), [0x1E]);
  assert_eq!(recode(b"[", Charset::Latin), [0x1F]);
  assert_eq!(recode(b"U", Charset::Latin), [0x1B]);
  assert_eq!(recode(b"a\r\nb", Charset::Latin), b"a\nb");
  // outside the printable window
  assert_eq!(recode(&[0x07, 0x80, 0x7F], Charset::Latin), b"???");
}

#[test]
fn raw_passthrough() {
  let data = [0x00u8, 0x07, 0x41, 0xFF];
  assert_eq!(recode(&data, Charset::Raw), data);
}

#[test]
fn cyrillic_utf8_tables() {
  // КУ -> "ku", terminated
  assert_eq!(recode("КУ".as_bytes(), Charset::Cyrillic), [b'k', b'u', 0x00]);
  assert_eq!(recode("мир".as_bytes(), Charset::Cyrillic), [b'M', b'I', b'R', 0x00]);
  assert_eq!(recode("Ёё".as_bytes(), Charset::Cyrillic), [b'e', b'E', 0x00]);
  // upper-case hard sign has no KOI-7 code
  assert_eq!(recode("Ъ".as_bytes(), Charset::Cyrillic), [b'?', 0x00]);
  assert_eq!(recode("ъ".as_bytes(), Charset::Cyrillic), [b'_', 0x00]);
  // anything outside the alphabet degrades, newline survives
  assert_eq!(recode("A\nБ".as_bytes(), Charset::Cyrillic), [b'?', b'\n', b'b', 0x00]);
}

#[test]
fn cyrillic_cp1251_fallback() {
  // "Привет" in CP-1251 is not valid UTF-8
  let cp1251 = [0xCFu8, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2];
  assert_eq!(
    recode(&cp1251, Charset::Cyrillic),
    [b'p', b'R', b'I', b'W', b'E', b'T', 0x00]
  );
  assert_eq!(recode(&[0xA8, 0xB8, 0xFF], Charset::Cyrillic), [b'e', b'E', b'Q', 0x00]);
}

#[test]
fn numeric_cells_are_reversed() {
  // "123" -> rev(1), rev(2), rev(3) = 0x8, 0x4, 0xC
  let bits = numeric_bits(b"123").unwrap();
  assert_eq!(bits.len(), 12);
  let collected: Vec<u8> = bits.iter().map(|b| *b as u8).collect();
  assert_eq!(collected, [1, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0]);
}

#[test]
fn alphanumeric_terminator() {
  // non-zero final cell: terminator appended
  let bits = alphanumeric_bits(b"A");
  assert_eq!(bits.len(), 14);
  // zero final cell: no terminator
  let bits = alphanumeric_bits(&[b'A', 0x00]);
  assert_eq!(bits.len(), 14);
  // empty message: nothing at all
  assert!(alphanumeric_bits(b"").is_empty());
}

#[test]
fn address_codeword_layout() {
  let cw = address_codeword(1234567, Function::C as u32);
  // type bit clear
  assert_eq!(cw & 0x8000_0000, 0);
  // 18 address bits
  assert_eq!((cw >> 13) & 0x3FFFF, 1234567 >> 3);
  // function code
  assert_eq!((cw >> 11) & 0b11, Function::C as u32);
  assert!(is_signed(cw));
}

#[test]
fn message_codeword_numeric_padding() {
  let bits = numeric_bits(b"123").unwrap();
  let mut offset = 0;
  let cw = message_codeword(&bits, &mut offset, true);
  assert_eq!(offset, 12);
  // 12 message bits then two bit-reversed space nibbles
  let expected = (0x84C33 << 11) | 0x8000_0000;
  assert_eq!(cw, sign_codeword(expected));
  // exhausted: idle from now on
  assert_eq!(message_codeword(&bits, &mut offset, true), IDLE_CODEWORD);
}

#[test]
fn message_codeword_alphanumeric_padding() {
  let bits = alphanumeric_bits(b"A");
  let mut offset = 0;
  let cw = message_codeword(&bits, &mut offset, false);
  assert_eq!(offset, 14);
  // 'A' is a 7 bit palindrome, then the zero terminator, then zero fill;
  // the 20 data bits 0x82000 land just below the message marker
  let expected = (0x82000 << 11) | 0x8000_0000;
  assert_eq!(cw, sign_codeword(expected));
}

#[test]
fn message_codeword_spans_cells() {
  // 6 numeric characters are 24 bits: the first codeword takes 20,
  // the second takes the remaining 4 plus padding
  let bits = numeric_bits(b"000000").unwrap();
  let mut offset = 0;
  let _ = message_codeword(&bits, &mut offset, true);
  assert_eq!(offset, 20);
  let _ = message_codeword(&bits, &mut offset, true);
  assert_eq!(offset, 24);
}

#[test]
fn date_stamp_format() {
  let mut encoder = Encoder::new();
  encoder.set_date_time_position(DateTimePosition::Begin);
  encoder.set_clock(|| {
    chrono::NaiveDate::from_ymd_opt(2023, 3, 5)
      .unwrap()
      .and_hms_opt(7, 40, 9)
      .unwrap()
  });

  let stamped = encoder
    .encode(0, MessageType::Alphanumeric, b"", Bps::Bps512, Charset::Latin, Function::A, true)
    .unwrap();
  let plain = Encoder::new()
    .encode(
      0,
      MessageType::Alphanumeric,
      b"05.03.2023 07:40:09 \n",
      Bps::Bps512,
      Charset::Latin,
      Function::A,
      true,
    )
    .unwrap();
  assert_eq!(stamped.bytes, plain.bytes);
}

#[test]
fn modulated_bit_sequence_matches_stream_order() {
  let encoder = Encoder::new();
  let raw = encoder
    .encode(3, MessageType::Tone, b"", Bps::Bps1200, Charset::Raw, Function::A, true)
    .unwrap();

  let sample_rate = encoder.sample_rate();
  let samples = modulate(&raw.bytes, 1200, sample_rate, 5000);
  let samples_per_bit = (sample_rate / 1200) as usize;
  let silence = (sample_rate / 2) as usize;

  // the two-level signal is exactly the LSB-first bit sequence of the stream
  let bits = bytes_to_bits(&raw.bytes);
  assert_eq!(samples.len(), 2 * silence + bits.len() * samples_per_bit);
  for (i, &bit) in bits.iter().enumerate() {
    let expected = if bit == 1 { 5000 } else { -5000 };
    let cell = &samples[silence + i * samples_per_bit..silence + (i + 1) * samples_per_bit];
    assert!(cell.iter().all(|&s| s == expected), "bit {} mismatch", i);
  }
}

#[test]
fn preamble_alternates() {
  let raw = Encoder::new()
    .encode(0, MessageType::Tone, b"", Bps::Bps512, Charset::Raw, Function::A, true)
    .unwrap();
  assert!(raw.bytes[..PREAMBLE_BYTES].iter().all(|&b| b == 0xAA));
  // 0xAA LSB-first starts with a zero bit
  assert_eq!(reverse_bits_n(0xAA, 8), 0x55);
}

#[test]
fn wav_container_is_canonical() {
  let samples: Vec<i16> = (0..100).map(|i| (i * 3) as i16 - 150).collect();
  let bytes = wrap_wav(&samples, 44_100).unwrap();
  assert_eq!(bytes.len(), 44 + samples.len() * 2);
  assert_eq!(&bytes[..4], b"RIFF");
  assert_eq!(&bytes[8..12], b"WAVE");

  let reader = hound::WavReader::new(Cursor::new(&bytes)).unwrap();
  let spec = reader.spec();
  assert_eq!(spec.channels, 1);
  assert_eq!(spec.sample_rate, 44_100);
  assert_eq!(spec.bits_per_sample, 16);
  let back: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
  assert_eq!(back, samples);
}
