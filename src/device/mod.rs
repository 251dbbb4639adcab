//! Contract of the single-carrier half-duplex SDR transmitter (HackRF
//! class). The real driver is an external collaborator; only the surface
//! the modulator needs is captured here, plus a mock driver that behaves
//! like one for tests and demos.

use std::sync::Arc;

mod mock;
pub use mock::{DeviceCall, MockDevice};

/// Pull-style sink the driver drains from its own thread.
pub trait TxSink: Send + Sync {
  /// Fill `dst` with the next interleaved I/Q bytes.
  /// Invoked from the driver thread; must never block.
  /// The return value is handed back to the driver, conventionally zero.
  fn on_data(&self, dst: &mut [i8]) -> i32;
}

/// Operations the modulator requires of the SDR driver.
pub trait Device: Send {
  /// attach the sink and open the hardware
  fn open(&mut self, sink: Arc<dyn TxSink>) -> bool;
  fn close(&mut self);

  fn set_frequency(&mut self, hz: u64);
  fn set_gain(&mut self, gain: f32);
  fn set_amp(&mut self, enable: bool);
  /// also configures the fixed baseband filter bandwidth
  /// ([`crate::DefaultConfig::BASEBAND_FILTER_HZ`])
  fn set_sample_rate(&mut self, rate: u32);

  fn start_tx(&mut self) -> bool;
  fn stop_tx(&mut self) -> bool;
  fn is_running(&self) -> bool;
}
