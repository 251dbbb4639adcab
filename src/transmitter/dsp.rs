use std::f64::consts::{PI, TAU};

use crate::default_config::DefaultConfig;

const BUF_LEN: usize = DefaultConfig::BUF_LEN;

/// Per-chunk DSP state of the worker: the linear interpolator with its
/// 4-sample tail, and the FM phase accumulator. Both are reset when a new
/// chunk is adopted and carried across sub-chunks within a chunk.
pub(crate) struct SubChunkDsp {
  local_gain: f32,
  deviation_hz: f64,
  am: bool,
  interpolated: Vec<f32>,
  iq: Vec<f32>,
  last_in: [f32; 4],
  phase: f64,
}

impl SubChunkDsp {
  pub fn new(local_gain: f32, deviation_hz: f64, am: bool) -> Self {
    Self {
      local_gain,
      deviation_hz,
      am,
      interpolated: vec![0.0; BUF_LEN],
      iq: vec![0.0; BUF_LEN * DefaultConfig::BYTES_PER_SAMPLE],
      last_in: [0.0; 4],
      phase: 0.0,
    }
  }

  /// forget the previous chunk: clear the interpolation tail and FM phase
  pub fn reset(&mut self) {
    self.last_in = [0.0; 4];
    self.phase = 0.0;
  }

  /// phase and tail of an interrupted chunk, preserved across a stop
  pub fn save(&self) -> (f64, [f32; 4]) {
    (self.phase, self.last_in)
  }

  pub fn restore(&mut self, phase: f64, last_in: [f32; 4]) {
    self.phase = phase;
    self.last_in = last_in;
  }

  /// interpolate `input` to `BUF_LEN` samples and modulate them to IQ;
  /// the result is readable through [`SubChunkDsp::iq`] until the next call
  pub fn process(&mut self, input: &[f32], device_rate: u32) {
    self.interpolate(input);
    self.modulate(device_rate);
  }

  /// Linear upsampling. The output position `j` maps to the fractional
  /// input position `(j+1) * input_len / BUF_LEN`; positions below one
  /// interpolate against the tail of the previous sub-chunk, and the final
  /// output sample always equals the final input sample.
  fn interpolate(&mut self, input: &[f32]) {
    let n = input.len();
    debug_assert!(n >= 1 && n <= BUF_LEN);
    let ratio = n as f32 / BUF_LEN as f32;

    let mut j = 0usize;
    let mut pos = ratio;
    while pos < 1.0 {
      self.interpolated[j] = self.last_in[3] + (input[0] - self.last_in[3]) * pos;
      j += 1;
      pos = (j + 1) as f32 * ratio;
    }

    while j < BUF_LEN - 1 {
      let i = pos as usize;
      self.interpolated[j] = input[i - 1] + (input[i] - input[i - 1]) * (pos - i as f32);
      j += 1;
      pos = (j + 1) as f32 * ratio;
    }

    self.interpolated[BUF_LEN - 1] = input[n - 1];

    // keep the last four input samples for the next sub-chunk
    for &x in &input[n.saturating_sub(4)..] {
      self.last_in.rotate_left(1);
      self.last_in[3] = x;
    }
  }

  /// FM or AM modulation of the interpolated buffer into interleaved IQ
  /// floats. FM keeps (I, Q) = (sin, cos) of the accumulated phase; the
  /// unusual assignment is part of the wire format.
  fn modulate(&mut self, device_rate: u32) {
    if self.am {
      for i in 0..BUF_LEN {
        let a = (self.interpolated[i] * self.local_gain).clamp(-1.0, 1.0);
        self.iq[i * 2] = a;
        self.iq[i * 2 + 1] = 0.0;
      }
      return;
    }

    let step = TAU * self.deviation_hz / device_rate as f64;
    for i in 0..BUF_LEN {
      let a = (self.interpolated[i] * self.local_gain).clamp(-1.0, 1.0);
      self.phase += step * a as f64;
      while self.phase > PI {
        self.phase -= TAU;
      }
      while self.phase < -PI {
        self.phase += TAU;
      }
      self.iq[i * 2] = self.phase.sin() as f32;
      self.iq[i * 2 + 1] = self.phase.cos() as f32;
    }
  }

  /// the interleaved IQ floats of the last processed sub-chunk
  pub fn iq(&self) -> &[f32] {
    &self.iq
  }

  #[cfg(test)]
  pub fn interpolated(&self) -> &[f32] {
    &self.interpolated
  }

  #[cfg(test)]
  pub fn phase(&self) -> f64 {
    self.phase
  }
}
