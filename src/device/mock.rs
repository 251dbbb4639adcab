use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use super::{Device, TxSink};
use crate::default_config::DefaultConfig;

/// a configuration or lifecycle call observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
  Frequency(u64),
  Gain(f32),
  Amp(bool),
  SampleRate(u32),
  StartTx,
  StopTx,
  Close,
}

/// Mock SDR driver. On `start_tx` a consumer thread pulls the sink with
/// `BUF_LEN` sized transfers, exactly like the real driver, keeping every
/// transfer that carried signal and counting the silent ones. Clones share
/// all state, so tests keep a clone and hand the original to the
/// transmitter.
pub struct MockDevice {
  sink: Arc<Mutex<Option<Arc<dyn TxSink>>>>,
  running: Arc<AtomicBool>,
  transfers: Arc<Mutex<Vec<Vec<i8>>>>,
  silent: Arc<AtomicUsize>,
  calls: Arc<Mutex<Vec<DeviceCall>>>,
  worker: Arc<Mutex<Option<JoinHandle<()>>>>,
  pull_len: usize,
  pull_interval: Duration,
  fail_open: bool,
  fail_start: bool,
}

impl MockDevice {
  pub fn new() -> Self {
    Self {
      sink: Arc::new(Mutex::new(None)),
      running: Arc::new(AtomicBool::new(false)),
      transfers: Arc::new(Mutex::new(Vec::new())),
      silent: Arc::new(AtomicUsize::new(0)),
      calls: Arc::new(Mutex::new(Vec::new())),
      worker: Arc::new(Mutex::new(None)),
      pull_len: DefaultConfig::BUF_LEN,
      pull_interval: Duration::from_micros(200),
      fail_open: false,
      fail_start: false,
    }
  }

  /// override the transfer size and cadence of the consumer thread
  pub fn with_pull(mut self, pull_len: usize, pull_interval: Duration) -> Self {
    self.pull_len = pull_len;
    self.pull_interval = pull_interval;
    self
  }

  /// make `open` fail, for error path tests
  pub fn refuse_open(mut self) -> Self {
    self.fail_open = true;
    self
  }

  /// make `start_tx` fail, for error path tests
  pub fn refuse_start(mut self) -> Self {
    self.fail_start = true;
    self
  }

  /// every transfer that carried signal, in drain order
  pub fn transfers(&self) -> Vec<Vec<i8>> {
    self.transfers.lock().unwrap().clone()
  }

  /// number of all-zero transfers the sink produced while the ring was dry
  pub fn silent_transfers(&self) -> usize {
    self.silent.load(Ordering::Acquire)
  }

  /// the configuration and lifecycle calls observed so far
  pub fn calls(&self) -> Vec<DeviceCall> {
    self.calls.lock().unwrap().clone()
  }

  fn record(&self, call: DeviceCall) {
    self.calls.lock().unwrap().push(call);
  }

  /// pull one transfer; returns whether it carried signal
  fn pull_once(
    sink: &Arc<dyn TxSink>,
    transfers: &Mutex<Vec<Vec<i8>>>,
    silent: &AtomicUsize,
    pull_len: usize,
  ) -> bool {
    let mut buf = vec![0i8; pull_len];
    sink.on_data(&mut buf);
    if buf.iter().any(|&b| b != 0) {
      transfers.lock().unwrap().push(buf);
      true
    } else {
      silent.fetch_add(1, Ordering::AcqRel);
      false
    }
  }

  fn join_consumer(&self) {
    if let Some(handle) = self.worker.lock().unwrap().take() {
      let _ = handle.join();
    }
  }
}

impl Clone for MockDevice {
  fn clone(&self) -> Self {
    Self {
      sink: self.sink.clone(),
      running: self.running.clone(),
      transfers: self.transfers.clone(),
      silent: self.silent.clone(),
      calls: self.calls.clone(),
      worker: self.worker.clone(),
      pull_len: self.pull_len,
      pull_interval: self.pull_interval,
      fail_open: self.fail_open,
      fail_start: self.fail_start,
    }
  }
}

impl Default for MockDevice {
  fn default() -> Self {
    Self::new()
  }
}

impl Device for MockDevice {
  fn open(&mut self, sink: Arc<dyn TxSink>) -> bool {
    if self.fail_open {
      warn!("mock device: refusing to open");
      return false;
    }
    *self.sink.lock().unwrap() = Some(sink);
    true
  }

  fn close(&mut self) {
    self.record(DeviceCall::Close);
    self.running.store(false, Ordering::Release);
    self.join_consumer();
    *self.sink.lock().unwrap() = None;
  }

  fn set_frequency(&mut self, hz: u64) {
    self.record(DeviceCall::Frequency(hz));
  }

  fn set_gain(&mut self, gain: f32) {
    self.record(DeviceCall::Gain(gain));
  }

  fn set_amp(&mut self, enable: bool) {
    self.record(DeviceCall::Amp(enable));
  }

  fn set_sample_rate(&mut self, rate: u32) {
    self.record(DeviceCall::SampleRate(rate));
  }

  fn start_tx(&mut self) -> bool {
    if self.fail_start {
      warn!("mock device: refusing to start TX");
      return false;
    }
    if self.running.load(Ordering::Acquire) {
      warn!("mock device: TX stream already running");
      return false;
    }
    let sink = match self.sink.lock().unwrap().clone() {
      Some(sink) => sink,
      None => return false,
    };
    self.record(DeviceCall::StartTx);
    self.running.store(true, Ordering::Release);

    let running = self.running.clone();
    let transfers = self.transfers.clone();
    let silent = self.silent.clone();
    let (pull_len, interval) = (self.pull_len, self.pull_interval);
    let handle = thread::spawn(move || {
      debug!("mock device: consumer thread up");
      while running.load(Ordering::Acquire) {
        Self::pull_once(&sink, &transfers, &silent, pull_len);
        thread::sleep(interval);
      }
    });
    *self.worker.lock().unwrap() = Some(handle);
    true
  }

  fn stop_tx(&mut self) -> bool {
    if !self.running.load(Ordering::Acquire) {
      return true;
    }
    self.record(DeviceCall::StopTx);
    self.running.store(false, Ordering::Release);
    self.join_consumer();

    // drain transfers still queued in the sink, like the hardware does:
    // the first silent transfer marks an empty pipeline
    if let Some(sink) = self.sink.lock().unwrap().clone() {
      while Self::pull_once(&sink, &self.transfers, &self.silent, self.pull_len) {}
    }
    true
  }

  fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }
}
