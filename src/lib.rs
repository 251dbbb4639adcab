/// common helper functions: bit order, codeword signing, little-endian codecs
pub mod helper;

/// the crate wide error type and result alias
pub mod error;

/// the defaults shared by the encoder and the transmitter
pub mod default_config;

/// POCSAG paging protocol encoder and its direct PCM (FSK-equivalent) modulator
pub mod pocsag;

/// PCM normalisation: WAV or raw byte buffers into mono float samples
pub mod pcm_source;

/// contract of the SDR device driver, plus a mock driver for tests and demos
pub mod device;

/// streaming FM/AM IQ modulator feeding the device callback
pub mod transmitter;

pub use default_config::DefaultConfig;
pub use error::{Error, Result};
