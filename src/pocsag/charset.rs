use crate::error::{Error, Result};

/// Re-encoding applied to alphanumeric message text before framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
  /// bytes pass through unchanged
  Raw,
  /// 7 bit pager Latin: control substitutions, everything else becomes '?'
  Latin,
  /// KOI-7 N2 transliteration of Cyrillic text (UTF-8 or CP-1251)
  Cyrillic,
}

/// numeric value of a character on the pager keypad.
pub(crate) fn numeric_value(c: u8) -> Result<u8> {
  match c {
    b'0'..=b'9' => Ok(c - b'0'),
    b'*' => Ok(0xA),
    b'U' | b'u' => Ok(0xB),
    b' ' | b'\n' => Ok(0xC),
    b'-' => Ok(0xD),
    b')' | b']' => Ok(0xE),
    b'(' | b'[' => Ok(0xF),
    _ => Err(Error::UnknownNumericChar(c as char)),
  }
}

/// KOI-7 N2 codes of the upper-case alphabet, indexed А..Я in alphabet order.
/// Upper-case letters land in the 0x60..0x7E column; Ъ has no code there
/// and degrades to '?'.
const CYR_UPPER: [u8; 32] = [
  b'a', b'b', b'w', b'g', b'd', b'e', b'v', b'z', // А Б В Г Д Е Ж З
  b'i', b'j', b'k', b'l', b'm', b'n', b'o', b'p', // И Й К Л М Н О П
  b'r', b's', b't', b'u', b'f', b'h', b'c', b'~', // Р С Т У Ф Х Ц Ч
  b'{', b'}', b'?', b'y', b'x', b'|', b'`', b'q', // Ш Щ Ъ Ы Ь Э Ю Я
];

/// KOI-7 N2 codes of the lower-case alphabet, indexed а..я in alphabet order.
const CYR_LOWER: [u8; 32] = [
  b'A', b'B', b'W', b'G', b'D', b'E', b'V', b'Z', // а б в г д е ж з
  b'I', b'J', b'K', b'L', b'M', b'N', b'O', b'P', // и й к л м н о п
  b'R', b'S', b'T', b'U', b'F', b'H', b'C', b'^', // р с т у ф х ц ч
  b'[', b']', b'_', b'Y', b'X', b'\\', b'@', b'Q', // ш щ ъ ы ь э ю я
];

/// re-encode alphanumeric text into the 7 bit pager alphabet.
pub(crate) fn recode(text: &[u8], charset: Charset) -> Vec<u8> {
  match charset {
    Charset::Raw => text.to_vec(),
    Charset::Latin => latin(text),
    Charset::Cyrillic => cyrillic(text),
  }
}

fn latin(text: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(text.len());
  for &b in text {
    match b {
      b'\r' => {}
      b']' => out.push(0x1E),
      b'[' => out.push(0x1F),
      b'U' => out.push(0x1B),
      b'\n' => out.push(b'\n'),
      0x1A..=0x7E => out.push(b),
      _ => out.push(b'?'),
    }
  }
  out
}

fn cyrillic(text: &[u8]) -> Vec<u8> {
  let mut out = match std::str::from_utf8(text) {
    Ok(s) => cyrillic_utf8(s),
    Err(_) => cyrillic_cp1251(text),
  };
  out.push(0x00);
  out
}

fn cyrillic_utf8(text: &str) -> Vec<u8> {
  text
    .chars()
    .map(|c| match c {
      '\n' => b'\n',
      'Ё' => b'e',
      'ё' => b'E',
      'А'..='Я' => CYR_UPPER[(c as u32 - 'А' as u32) as usize],
      'а'..='я' => CYR_LOWER[(c as u32 - 'а' as u32) as usize],
      _ => b'?',
    })
    .collect()
}

/// CP-1251 fallback for text that is not valid UTF-8:
/// 0xC0..0xDF upper case, 0xE0..0xFF lower case, 0xA8/0xB8 for Ё/ё.
fn cyrillic_cp1251(text: &[u8]) -> Vec<u8> {
  text
    .iter()
    .map(|&b| match b {
      b'\n' => b'\n',
      0xA8 => b'e',
      0xB8 => b'E',
      0xC0..=0xDF => CYR_UPPER[(b - 0xC0) as usize],
      0xE0..=0xFF => CYR_LOWER[(b - 0xE0) as usize],
      _ => b'?',
    })
    .collect()
}
