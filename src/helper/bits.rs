/// bytes to bits, least significant bit of each byte first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
  let mut bits = Vec::with_capacity(bytes.len() * 8);
  bytes
    .iter()
    .for_each(|byte| (0..8).for_each(|i| bits.push((byte >> i) & 1)));
  bits
}

/// the reverse process of [`bytes_to_bits`].
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
  assert_eq!(bits.len() % 8, 0);
  let mut bytes = Vec::with_capacity(bits.len() / 8);
  bits
    .chunks_exact(8)
    .for_each(|bits| bytes.push(bits.iter().rev().fold(0, |s, bit| (s << 1) | bit)));
  bytes
}

/// the low `n` bits of `x` with their bit order reversed.
pub fn reverse_bits_n(x: u32, n: u32) -> u32 {
  debug_assert!(n >= 1 && n <= 32);
  x.reverse_bits() >> (32 - n)
}

/// append the four bytes of `w` in little-endian order.
/// the byte order inside the output vector is part of the wire format:
/// the PCM modulator re-reads codewords from it with [`read_u32_le`].
pub fn push_u32_le(buf: &mut Vec<u8>, w: u32) {
  buf.extend_from_slice(&w.to_le_bytes());
}

/// read back a 32 bit little-endian word from the head of `bytes`.
pub fn read_u32_le(bytes: &[u8]) -> u32 {
  u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// read back a 16 bit little-endian word from the head of `bytes`.
pub fn read_u16_le(bytes: &[u8]) -> u16 {
  u16::from_le_bytes([bytes[0], bytes[1]])
}
