pub struct DefaultConfig;

impl DefaultConfig {
  /// number of interpolated samples in one sub-chunk, the device transfer unit
  pub const BUF_LEN: usize = 262_144;
  /// bytes per IQ sample: one I byte and one Q byte
  pub const BYTES_PER_SAMPLE: usize = 2;
  /// number of slots in the transmit ring
  pub const BUF_NUM: usize = 256;
  /// baseband filter bandwidth handed to the device with every sample rate change
  pub const BASEBAND_FILTER_HZ: u32 = 1_750_000;
  /// input PCM samples consumed per tick before interpolation
  pub const SUB_CHUNK_SAMPLES: usize = 2048;
  /// default FM deviation in kHz
  pub const FM_DEVIATION_KHZ: f64 = 75.0;
  /// default local gain in percent
  pub const LOCAL_GAIN_PERCENT: f32 = 90.0;
  /// default PCM sampling rate of the POCSAG modulator
  pub const POCSAG_SAMPLE_RATE: u32 = 44_100;
  /// default PCM amplitude of the POCSAG modulator
  pub const POCSAG_AMPLITUDE: i16 = 5_000;
  /// default cap on the number of POCSAG batches per transmission
  pub const POCSAG_MAX_BATCHES: usize = 8;
}
