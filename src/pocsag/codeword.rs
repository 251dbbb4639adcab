use bitvec::prelude::*;

use super::charset::numeric_value;
use super::{ALPHA_CHAR_BITS, DATA_BITS_PER_CODEWORD, IDLE_CODEWORD, MESSAGE_BIT, NUMERIC_CHAR_BITS};
use crate::error::Result;
use crate::helper::{reverse_bits_n, sign_codeword};

/// message bits in transmit order: each character cell bit-reversed,
/// most significant bit of the reversed cell first.
pub(crate) type MessageBits = BitVec<u8, Msb0>;

/// push the low `width` bits of `value` in reversed order.
fn push_reversed(bits: &mut MessageBits, value: u32, width: usize) {
  let rev = reverse_bits_n(value, width as u32);
  for k in (0..width).rev() {
    bits.push((rev >> k) & 1 == 1);
  }
}

/// 4 bit cells of a numeric message.
/// Fails on characters without a numeric mapping.
pub(crate) fn numeric_bits(text: &[u8]) -> Result<MessageBits> {
  let mut bits = MessageBits::with_capacity(text.len() * NUMERIC_CHAR_BITS);
  for &c in text {
    push_reversed(&mut bits, numeric_value(c)? as u32, NUMERIC_CHAR_BITS);
  }
  Ok(bits)
}

/// 7 bit cells of an alphanumeric message.
/// A zero terminator cell is appended iff the final cell is non-zero.
pub(crate) fn alphanumeric_bits(text: &[u8]) -> MessageBits {
  let mut bits = MessageBits::with_capacity((text.len() + 1) * ALPHA_CHAR_BITS);
  let mut last = 0u32;
  for &c in text {
    last = (c & 0x7F) as u32;
    push_reversed(&mut bits, last, ALPHA_CHAR_BITS);
  }
  if last != 0 {
    push_reversed(&mut bits, 0, ALPHA_CHAR_BITS);
  }
  bits
}

/// address codeword: type bit 0, 18 address bits, 2 function bits, signing.
/// The low 3 address bits are implied by the frame position.
pub(crate) fn address_codeword(ric: u32, function: u32) -> u32 {
  sign_codeword(((ric >> 3) << 13) | ((function & 0b11) << 11))
}

/// Build the next message codeword from `bits` starting at `offset`,
/// consuming up to 20 bits. A partially filled codeword is padded with
/// bit-reversed space nibbles (numeric) or zero bits (alphanumeric).
/// Returns the idle codeword once the buffer is exhausted.
pub(crate) fn message_codeword(bits: &MessageBits, offset: &mut usize, numeric: bool) -> u32 {
  if *offset >= bits.len() {
    return IDLE_CODEWORD;
  }

  let mut cw = 0u32;
  let mut taken = 0usize;
  while taken < DATA_BITS_PER_CODEWORD && *offset + taken < bits.len() {
    cw = (cw << 1) | bits[*offset + taken] as u32;
    taken += 1;
  }

  if taken < DATA_BITS_PER_CODEWORD {
    if numeric {
      // numeric cells are whole nibbles, so the remainder is too
      for _ in 0..(DATA_BITS_PER_CODEWORD - taken) / NUMERIC_CHAR_BITS {
        cw = (cw << NUMERIC_CHAR_BITS) | reverse_bits_n(0xC, NUMERIC_CHAR_BITS as u32);
      }
    } else {
      cw <<= DATA_BITS_PER_CODEWORD - taken;
    }
  }

  *offset += taken;
  sign_codeword((cw << 11) | MESSAGE_BIT)
}
