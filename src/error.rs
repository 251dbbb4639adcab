use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("RIC {0} is out of range (21 bit addresses only)")]
  AddressOutOfRange(u32),

  #[error("character {0:?} has no numeric mapping")]
  UnknownNumericChar(char),

  #[error("message needs {needed} batches, the configured limit is {limit}")]
  BatchLimitExceeded { needed: usize, limit: usize },

  #[error("cannot change {0} while transmission is active")]
  ConfigLocked(&'static str),

  #[error("unsupported bits per sample: {0}")]
  UnsupportedBitDepth(u16),

  #[error("unsupported channel count: {0} (only mono and stereo)")]
  UnsupportedChannels(u16),

  #[error("buffer size is not a multiple of the sample byte width")]
  BufferSizeMismatch,

  #[error("not a RIFF/WAVE file or buffer")]
  NotRiff,

  #[error("truncated wave data")]
  TruncatedWave,

  #[error("only linear PCM wave data is supported")]
  NonPcmFormat,

  #[error("wave error: {0}")]
  Wave(#[from] hound::Error),

  #[error("failed to open the SDR device")]
  DeviceUnavailable,

  #[error("failed to stop TX: worker did not acknowledge in time")]
  StopTimeout,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
