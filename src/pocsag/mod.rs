//! POCSAG paging protocol: batches of 17 codewords behind a 576 bit
//! preamble, each codeword carrying 20 data bits signed with BCH(31,21)
//! and an even parity bit.

mod charset;
pub use charset::Charset;

mod codeword;

mod encoder;
pub use encoder::{Bps, DateTimePosition, Encoded, Encoder, Function, MessageType};

mod modulate;

#[cfg(test)]
mod tests;

/// codeword transmitted at the start of every batch
pub const SYNC_CODEWORD: u32 = 0x7CD2_15D8;
/// codeword filling every empty slot
pub const IDLE_CODEWORD: u32 = 0x7A89_C197;
/// marker bit distinguishing message codewords from address codewords
pub(crate) const MESSAGE_BIT: u32 = 0x8000_0000;

/// number of preamble bytes preceding the first sync codeword
pub const PREAMBLE_BYTES: usize = 72;
/// the alternating-bit preamble pattern
pub const PREAMBLE_PATTERN: u8 = 0xAA;

/// frames in one batch; the address is placed in frame `ric % 8`
pub const FRAMES_PER_BATCH: usize = 8;
/// codewords in one batch: sync plus eight frames of two
pub const CODEWORDS_PER_BATCH: usize = 17;
/// data bits carried by one codeword
pub(crate) const DATA_BITS_PER_CODEWORD: usize = 20;

/// bits per numeric character cell
pub(crate) const NUMERIC_CHAR_BITS: usize = 4;
/// bits per alphanumeric character cell
pub(crate) const ALPHA_CHAR_BITS: usize = 7;

/// largest RIC a 21 bit address field can carry
pub const ADDRESS_MAX: u32 = 2_097_151;
