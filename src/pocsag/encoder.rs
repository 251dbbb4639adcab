use chrono::NaiveDateTime;
use log::debug;

use super::charset::{recode, Charset};
use super::codeword::{address_codeword, alphanumeric_bits, message_codeword, numeric_bits, MessageBits};
use super::modulate::{modulate, wrap_wav};
use super::{
  ADDRESS_MAX, CODEWORDS_PER_BATCH, DATA_BITS_PER_CODEWORD, FRAMES_PER_BATCH, IDLE_CODEWORD, PREAMBLE_BYTES,
  PREAMBLE_PATTERN, SYNC_CODEWORD,
};
use crate::default_config::DefaultConfig;
use crate::error::{Error, Result};
use crate::helper::push_u32_le;

/// kind of pager message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
  Numeric,
  Alphanumeric,
  /// address-only notification without content
  Tone,
}

/// 2 bit function code; selects the receiver-side notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
  A = 0b00,
  B = 0b01,
  C = 0b10,
  D = 0b11,
}

/// POCSAG transmission speed in bits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bps {
  Bps512 = 512,
  Bps1200 = 1200,
  Bps2400 = 2400,
}

impl Bps {
  pub fn rate(self) -> u32 {
    self as u32
  }
}

/// where the transmission date and time is injected into the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimePosition {
  None,
  Begin,
  End,
}

/// output of [`Encoder::encode`]
#[derive(Debug, Clone)]
pub struct Encoded {
  /// the framed byte stream (raw mode) or a RIFF/WAVE container (PCM mode)
  pub bytes: Vec<u8>,
  /// bits in the framed stream (raw mode) or PCM samples produced (PCM mode)
  pub count: usize,
}

/// Builds POCSAG frame streams and, optionally, their direct PCM
/// (FSK-equivalent) modulation wrapped in a WAV container.
pub struct Encoder {
  sample_rate: u32,
  amplitude: i16,
  max_batches: usize,
  date_time: DateTimePosition,
  clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
  chrono::Local::now().naive_local()
}

impl Encoder {
  pub fn new() -> Self {
    Self {
      sample_rate: DefaultConfig::POCSAG_SAMPLE_RATE,
      amplitude: DefaultConfig::POCSAG_AMPLITUDE,
      max_batches: DefaultConfig::POCSAG_MAX_BATCHES,
      date_time: DateTimePosition::None,
      clock: local_now,
    }
  }

  /// sampling rate of the modulated PCM signal
  pub fn sample_rate(&self) -> u32 {
    self.sample_rate
  }

  pub fn set_sample_rate(&mut self, sample_rate: u32) {
    self.sample_rate = sample_rate;
  }

  /// amplitude (volume) of the modulated PCM signal
  pub fn amplitude(&self) -> i16 {
    self.amplitude
  }

  pub fn set_amplitude(&mut self, amplitude: i16) {
    self.amplitude = amplitude;
  }

  /// cap on the number of batches a single message may span
  pub fn set_max_batches(&mut self, max_batches: usize) {
    self.max_batches = max_batches;
  }

  /// where to stamp the transmission date and time into alphanumeric messages
  pub fn set_date_time_position(&mut self, position: DateTimePosition) {
    self.date_time = position;
  }

  /// Replace the wall clock used for date stamping.
  /// The default reads `chrono::Local`; tests inject a fixed clock here.
  pub fn set_clock(&mut self, clock: fn() -> NaiveDateTime) {
    self.clock = clock;
  }

  fn date_stamp(&self) -> Vec<u8> {
    (self.clock)().format("%d.%m.%Y %H:%M:%S \n").to_string().into_bytes()
  }

  /// message cells in transmit order, after charset re-encoding and date stamping
  fn message_bits(&self, msg_type: MessageType, text: &[u8], charset: Charset) -> Result<MessageBits> {
    match msg_type {
      MessageType::Tone => Ok(MessageBits::new()),
      MessageType::Numeric => numeric_bits(text),
      MessageType::Alphanumeric => {
        let mut data = recode(text, charset);
        match self.date_time {
          DateTimePosition::None => {}
          DateTimePosition::Begin => {
            let mut stamped = self.date_stamp();
            stamped.extend_from_slice(&data);
            data = stamped;
          }
          DateTimePosition::End => data.extend(self.date_stamp()),
        }
        Ok(alphanumeric_bits(&data))
      }
    }
  }

  /// Encode a message for the pager at `address` into a POCSAG stream.
  ///
  /// With `raw_only` the result is the framed byte stream (preamble plus
  /// batches of little-endian codewords) and `count` is its size in bits.
  /// Otherwise the stream is modulated into two-level PCM and wrapped in a
  /// WAV container, with `count` the number of PCM samples.
  pub fn encode(
    &self,
    address: u32,
    msg_type: MessageType,
    text: &[u8],
    bps: Bps,
    charset: Charset,
    function: Function,
    raw_only: bool,
  ) -> Result<Encoded> {
    if address > ADDRESS_MAX {
      return Err(Error::AddressOutOfRange(address));
    }

    let bits = self.message_bits(msg_type, text, charset)?;
    let addr_frame = (address & 0b111) as usize;
    let batch_count = self.batch_count(addr_frame, bits.len())?;
    debug!(
      "pocsag: ric={} frame={} message_bits={} batches={}",
      address,
      addr_frame,
      bits.len(),
      batch_count
    );

    let mut out = Vec::with_capacity(PREAMBLE_BYTES + batch_count * CODEWORDS_PER_BATCH * 4);
    out.extend(std::iter::repeat(PREAMBLE_PATTERN).take(PREAMBLE_BYTES));

    let numeric = msg_type == MessageType::Numeric;
    let tone = msg_type == MessageType::Tone;
    let mut addr_placed = false;
    let mut offset = 0usize;

    for _ in 0..batch_count {
      push_u32_le(&mut out, SYNC_CODEWORD);
      for frame in 0..FRAMES_PER_BATCH {
        if !addr_placed && frame != addr_frame {
          push_u32_le(&mut out, IDLE_CODEWORD);
          push_u32_le(&mut out, IDLE_CODEWORD);
          continue;
        }

        let mut slots = 2;
        if !addr_placed {
          push_u32_le(&mut out, address_codeword(address, function as u32));
          addr_placed = true;
          slots = 1;
        }
        for _ in 0..slots {
          let cw = if tone {
            IDLE_CODEWORD
          } else {
            message_codeword(&bits, &mut offset, numeric)
          };
          push_u32_le(&mut out, cw);
        }
      }
    }

    if raw_only {
      return Ok(Encoded {
        count: out.len() * 8,
        bytes: out,
      });
    }

    let samples = modulate(&out, bps.rate(), self.sample_rate, self.amplitude);
    let count = samples.len();
    Ok(Encoded {
      bytes: wrap_wav(&samples, self.sample_rate)?,
      count,
    })
  }

  /// Number of batches needed for `message_bits` bits behind the address in
  /// frame `addr_frame`, plus one guard batch when the last populated frame
  /// is the final frame of its batch (receivers tend to misread trailing
  /// characters otherwise).
  fn batch_count(&self, addr_frame: usize, message_bits: usize) -> Result<usize> {
    let frame_bits = 2 * DATA_BITS_PER_CODEWORD;
    let batch_bits = FRAMES_PER_BATCH * frame_bits;

    // idle frames before the address, plus the address slot itself
    let addr_bit_skip = addr_frame * frame_bits + DATA_BITS_PER_CODEWORD;
    let total_bits = addr_bit_skip + message_bits;

    let mut batches = (total_bits + batch_bits - 1) / batch_bits;
    let last_frame = ((total_bits - 1) % batch_bits) / frame_bits;
    if last_frame == FRAMES_PER_BATCH - 1 {
      batches += 1;
    }

    if batches > self.max_batches {
      return Err(Error::BatchLimitExceeded {
        needed: batches,
        limit: self.max_batches,
      });
    }
    Ok(batches)
  }
}

impl Default for Encoder {
  fn default() -> Self {
    Self::new()
  }
}
