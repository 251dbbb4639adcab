mod bits;
pub use bits::{bits_to_bytes, bytes_to_bits, push_u32_le, read_u16_le, read_u32_le, reverse_bits_n};

mod signing;
pub use signing::{is_signed, sign_codeword};
