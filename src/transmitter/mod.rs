//! Streaming FM/AM modulator: a producer worker consumes queued PCM
//! chunks, interpolates sub-chunks to the device rate, modulates them to
//! IQ and publishes quantized slots to a ring the device callback drains.

mod dsp;
mod ring;


use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::default_config::DefaultConfig;
use crate::device::{Device, TxSink};
use crate::error::{Error, Result};
use crate::pcm_source::PcmSource;
use dsp::SubChunkDsp;
use ring::SlotRing;

const BUF_LEN: usize = DefaultConfig::BUF_LEN;

/// lifecycle states of the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Idle = 0,
  Starting = 1,
  Running = 2,
  Stopping = 3,
}

struct AtomicState(AtomicU8);

impl AtomicState {
  fn new() -> Self {
    Self(AtomicU8::new(RunState::Idle as u8))
  }

  fn load(&self) -> RunState {
    match self.0.load(Ordering::Acquire) {
      0 => RunState::Idle,
      1 => RunState::Starting,
      2 => RunState::Running,
      _ => RunState::Stopping,
    }
  }

  fn store(&self, state: RunState) {
    self.0.store(state as u8, Ordering::Release);
  }
}

/// the chunk queue and the PCM rate its chunks were recorded at
struct TxQueue {
  chunks: VecDeque<Vec<f32>>,
  pcm_rate: u32,
}

/// progress of a chunk interrupted by a stop, resumed on the next start
#[derive(Default)]
struct ChunkProgress {
  chunk: Vec<f32>,
  offset: usize,
  phase: f64,
  tail: [f32; 4],
}

/// state shared between the API object, the worker and the device callback
struct Shared {
  ring: SlotRing,
  queue: Mutex<TxQueue>,
  progress: Mutex<ChunkProgress>,
  state: AtomicState,
  stop: AtomicBool,
  empty_queue: AtomicBool,
  chunk_active: AtomicBool,
  device_rate: AtomicU32,
}

impl Shared {
  fn new() -> Self {
    Self {
      ring: SlotRing::new(),
      queue: Mutex::new(TxQueue {
        chunks: VecDeque::new(),
        pcm_rate: 0,
      }),
      progress: Mutex::new(ChunkProgress::default()),
      state: AtomicState::new(),
      stop: AtomicBool::new(false),
      empty_queue: AtomicBool::new(true),
      chunk_active: AtomicBool::new(false),
      device_rate: AtomicU32::new(0),
    }
  }
}

/// the device-callback half of the transmitter: quantized slots out,
/// silence when the ring is dry
struct RingSink(Arc<Shared>);

impl TxSink for RingSink {
  fn on_data(&self, dst: &mut [i8]) -> i32 {
    self.0.ring.drain(dst);
    0
  }
}

/// configuration scalars, snapshot into the worker at start
#[derive(Clone)]
struct Config {
  local_gain: f32,
  sub_chunk_samples: usize,
  deviation_hz: f64,
  am: bool,
  no_idle_tx: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      local_gain: DefaultConfig::LOCAL_GAIN_PERCENT / 100.0,
      sub_chunk_samples: DefaultConfig::SUB_CHUNK_SAMPLES,
      deviation_hz: DefaultConfig::FM_DEVIATION_KHZ * 1000.0,
      am: false,
      no_idle_tx: false,
    }
  }
}

/// Streaming transmitter over an SDR device. Owns the device for its whole
/// lifetime: opened on construction, closed on drop.
pub struct Transmitter<D: Device + 'static> {
  device: Arc<Mutex<D>>,
  shared: Arc<Shared>,
  config: Config,
  worker: Option<JoinHandle<()>>,
  stopped_rx: Option<Receiver<bool>>,
}

/// device rate: the PCM rate scaled so one sub-chunk fills one transfer
pub(crate) fn device_sample_rate(pcm_rate: u32, sub_chunk_samples: usize) -> u32 {
  (pcm_rate as f64 * DefaultConfig::BUF_LEN as f64 / sub_chunk_samples as f64).round() as u32
}

impl<D: Device + 'static> Transmitter<D> {
  /// take ownership of the device and open it
  pub fn new(mut device: D) -> Result<Self> {
    let shared = Arc::new(Shared::new());
    let sink: Arc<dyn TxSink> = Arc::new(RingSink(shared.clone()));
    if !device.open(sink) {
      return Err(Error::DeviceUnavailable);
    }
    Ok(Self {
      device: Arc::new(Mutex::new(device)),
      shared,
      config: Config::default(),
      worker: None,
      stopped_rx: None,
    })
  }

  fn ensure_idle(&self, what: &'static str) -> Result<()> {
    if self.shared.state.load() != RunState::Idle {
      return Err(Error::ConfigLocked(what));
    }
    Ok(())
  }

  pub fn set_frequency(&mut self, hz: u64) -> Result<()> {
    self.ensure_idle("frequency")?;
    self.device.lock().unwrap().set_frequency(hz);
    Ok(())
  }

  /// convenience form taking MHz, kHz and Hz parts
  pub fn set_frequency_parts(&mut self, mhz: u64, khz: u64, hz: u64) -> Result<()> {
    self.set_frequency(mhz * 1_000_000 + khz * 1_000 + hz)
  }

  pub fn set_gain_rf(&mut self, gain: f32) -> Result<()> {
    self.ensure_idle("RF gain")?;
    self.device.lock().unwrap().set_gain(gain);
    Ok(())
  }

  pub fn set_amp(&mut self, enable: bool) -> Result<()> {
    self.ensure_idle("RF amplifier")?;
    self.device.lock().unwrap().set_amp(enable);
    Ok(())
  }

  /// scaling applied to input samples before modulation, in percent
  pub fn set_local_gain(&mut self, percent: f32) -> Result<()> {
    self.ensure_idle("local gain")?;
    self.config.local_gain = percent / 100.0;
    Ok(())
  }

  /// input PCM samples consumed per tick
  pub fn set_sub_chunk_samples(&mut self, count: usize) -> Result<()> {
    self.ensure_idle("sub-chunk size")?;
    self.config.sub_chunk_samples = count;
    Ok(())
  }

  /// switch between AM (I = audio, Q = 0) and FM modulation
  pub fn set_am(&mut self, am: bool) -> Result<()> {
    self.ensure_idle("modulation")?;
    self.config.am = am;
    Ok(())
  }

  pub fn set_fm_deviation_khz(&mut self, khz: f64) -> Result<()> {
    self.ensure_idle("FM deviation")?;
    self.config.deviation_hz = khz * 1000.0;
    Ok(())
  }

  /// halt the device whenever the queue drains, restart it on the next chunk
  pub fn set_turn_off_tx_when_idle(&mut self, off: bool) -> Result<()> {
    self.ensure_idle("idle TX policy")?;
    self.config.no_idle_tx = off;
    Ok(())
  }

  /// PCM rate assumed for queued chunks; normally taken from the first push
  pub fn set_pcm_sample_rate(&mut self, rate: u32) -> Result<()> {
    self.ensure_idle("PCM sample rate")?;
    self.shared.queue.lock().unwrap().pcm_rate = rate;
    Ok(())
  }

  /// drop all queued samples and any interrupted chunk
  pub fn clear(&mut self) -> Result<()> {
    self.ensure_idle("queue")?;
    self.shared.queue.lock().unwrap().chunks.clear();
    *self.shared.progress.lock().unwrap() = ChunkProgress::default();
    self.shared.chunk_active.store(false, Ordering::Release);
    self.shared.empty_queue.store(true, Ordering::Release);
    Ok(())
  }

  /// Queue a chunk for transmission. Safe to call while TX is active; the
  /// PCM rate follows the source unless a transmission is already using it.
  pub fn push_samples(&self, source: &PcmSource) {
    let mut queue = self.shared.queue.lock().unwrap();
    if self.shared.state.load() != RunState::Running || queue.pcm_rate == 0 {
      queue.pcm_rate = source.sample_rate();
    }
    queue.chunks.push_back(source.samples().to_vec());
    self.shared.empty_queue.store(false, Ordering::Release);
  }

  /// Launch the worker and bring the TX stream up. Returns false when TX
  /// is already active, the device refuses to start, or the worker does
  /// not acknowledge within ten seconds.
  pub fn start(&mut self) -> bool {
    if self.shared.state.load() != RunState::Idle {
      return false;
    }
    // a failed earlier start leaves a finished worker behind
    if let Some(handle) = self.worker.take() {
      let _ = handle.join();
    }
    self.shared.state.store(RunState::Starting);

    {
      let progress = self.shared.progress.lock().unwrap();
      if progress.chunk.is_empty() {
        // fresh start: prime the device rate from the queued material
        let queue = self.shared.queue.lock().unwrap();
        if !queue.chunks.is_empty() && queue.pcm_rate != 0 {
          let rate = device_sample_rate(queue.pcm_rate, self.config.sub_chunk_samples);
          self.shared.device_rate.store(rate, Ordering::Release);
          self.device.lock().unwrap().set_sample_rate(rate);
        }
      }
    }

    self.shared.stop.store(false, Ordering::Release);
    self.shared.ring.set_ready();

    let (started_tx, started_rx) = mpsc::channel();
    let (stopped_tx, stopped_rx) = mpsc::channel();
    let shared = self.shared.clone();
    let device = self.device.clone();
    let config = self.config.clone();
    self.worker = Some(thread::spawn(move || {
      worker_main(shared, device, config, started_tx, stopped_tx)
    }));
    self.stopped_rx = Some(stopped_rx);

    match started_rx.recv_timeout(Duration::from_secs(10)) {
      Ok(ok) => ok,
      Err(_) => {
        warn!("transmitter: start not acknowledged within 10 s");
        false
      }
    }
  }

  /// Request the worker to stop, wait up to thirty seconds for it to drain
  /// and join it. `Ok(false)` when no transmission was active.
  pub fn stop(&mut self) -> Result<bool> {
    if self.shared.state.load() == RunState::Idle {
      if let Some(handle) = self.worker.take() {
        let _ = handle.join();
      }
      return Ok(false);
    }

    self.shared.state.store(RunState::Stopping);
    self.shared.stop.store(true, Ordering::Release);

    let stopped = match &self.stopped_rx {
      Some(rx) => match rx.recv_timeout(Duration::from_secs(30)) {
        Ok(ok) => ok,
        // the worker never reached its running loop
        Err(RecvTimeoutError::Disconnected) => false,
        Err(RecvTimeoutError::Timeout) => return Err(Error::StopTimeout),
      },
      None => false,
    };

    if let Some(handle) = self.worker.take() {
      let _ = handle.join();
    }
    self.stopped_rx = None;
    self.shared.device_rate.store(0, Ordering::Release);
    Ok(stopped)
  }

  pub fn run_state(&self) -> RunState {
    self.shared.state.load()
  }

  pub fn is_running(&self) -> bool {
    self.run_state() == RunState::Running
  }

  /// TX is up but the queue is drained and no chunk is being transmitted
  pub fn is_idle(&self) -> bool {
    self.is_running()
      && self.shared.empty_queue.load(Ordering::Acquire)
      && !self.shared.chunk_active.load(Ordering::Acquire)
  }

  /// poll until the transmitter returns to the idle lifecycle state
  pub fn wait_for_end(&self, timeout: Duration) -> bool {
    poll(timeout, || !self.is_running())
  }

  /// poll until the queue and the current chunk are drained
  pub fn wait_for_idle(&self, timeout: Duration) -> bool {
    poll(timeout, || self.is_idle())
  }

  /// the sample rate last pushed to the device, zero before the first chunk
  pub fn device_sample_rate(&self) -> u32 {
    self.shared.device_rate.load(Ordering::Acquire)
  }

  pub fn sub_chunk_samples(&self) -> usize {
    self.config.sub_chunk_samples
  }
}

fn poll(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
  let step = Duration::from_millis(10);
  let mut waited = Duration::ZERO;
  loop {
    if done() {
      return true;
    }
    if waited >= timeout {
      return false;
    }
    thread::sleep(step);
    waited += step;
  }
}

impl<D: Device + 'static> Drop for Transmitter<D> {
  fn drop(&mut self) {
    if self.shared.state.load() != RunState::Idle {
      if let Err(err) = self.stop() {
        warn!("transmitter: {} while dropping", err);
      }
    } else if let Some(handle) = self.worker.take() {
      let _ = handle.join();
    }
    self.device.lock().unwrap().close();
  }
}

fn worker_main<D: Device>(
  shared: Arc<Shared>,
  device: Arc<Mutex<D>>,
  config: Config,
  started: Sender<bool>,
  stopped: Sender<bool>,
) {
  if !device.lock().unwrap().start_tx() {
    warn!("transmitter: device refused to start TX");
    shared.state.store(RunState::Idle);
    let _ = started.send(false);
    return;
  }
  shared.state.store(RunState::Running);
  let _ = started.send(true);
  debug!("transmitter: worker up");

  let mut dsp = SubChunkDsp::new(config.local_gain, config.deviation_hz, config.am);
  // resume a chunk interrupted by the previous stop, if any
  let (mut current, mut offset) = {
    let mut progress = shared.progress.lock().unwrap();
    dsp.restore(progress.phase, progress.tail);
    (std::mem::take(&mut progress.chunk), progress.offset)
  };
  shared.chunk_active.store(!current.is_empty(), Ordering::Release);

  // the start above proved the device works; take it down again if there
  // is nothing to transmit yet
  if config.no_idle_tx && current.is_empty() && shared.queue.lock().unwrap().chunks.is_empty() {
    device.lock().unwrap().stop_tx();
  }

  let mut pending = 0usize;
  if !current.is_empty() {
    if prepare_next(&mut dsp, current.as_slice(), &mut offset, &mut pending, &shared, &device, &config) {
      process_chunk(&mut dsp, &mut current, &mut offset, &mut pending, &shared, &device, &config);
    } else {
      current.clear();
      shared.chunk_active.store(false, Ordering::Release);
    }
  }

  while !shared.stop.load(Ordering::Acquire) {
    let popped = shared.queue.lock().unwrap().chunks.pop_front();
    match popped {
      None => {
        shared.empty_queue.store(true, Ordering::Release);
        thread::yield_now();
      }
      Some(chunk) => {
        current = chunk;
        offset = 0;
        // a fresh chunk starts from a clean phase and interpolation tail
        dsp.reset();
        shared.chunk_active.store(true, Ordering::Release);
        if prepare_next(&mut dsp, current.as_slice(), &mut offset, &mut pending, &shared, &device, &config) {
          process_chunk(&mut dsp, &mut current, &mut offset, &mut pending, &shared, &device, &config);
        } else {
          current.clear();
          shared.chunk_active.store(false, Ordering::Release);
        }
      }
    }
  }

  if !current.is_empty() {
    // preserve the interrupted chunk; the pending sub-chunk was prepared
    // but never published, so it is re-prepared on resume
    let (phase, tail) = dsp.save();
    let mut progress = shared.progress.lock().unwrap();
    progress.chunk = current;
    progress.offset = offset - pending;
    progress.phase = phase;
    progress.tail = tail;
  }

  let stopped_ok = device.lock().unwrap().stop_tx();
  shared.state.store(RunState::Idle);
  debug!("transmitter: worker down");
  let _ = stopped.send(stopped_ok);
}

/// The inner transmit loop: publish the prepared sub-chunk whenever the
/// ring drains, then prepare the next one while the device transmits.
/// Returns true when the chunk completed, false on stop.
fn process_chunk<D: Device>(
  dsp: &mut SubChunkDsp,
  current: &mut Vec<f32>,
  offset: &mut usize,
  pending: &mut usize,
  shared: &Shared,
  device: &Mutex<D>,
  config: &Config,
) -> bool {
  loop {
    if shared.stop.load(Ordering::Acquire) {
      return false;
    }
    if !shared.ring.wait_ready(&shared.stop) {
      return false;
    }

    // restart the device if the idle shutdown took it down
    {
      let mut dev = device.lock().unwrap();
      if !dev.is_running() && !shared.stop.load(Ordering::Acquire) {
        dev.start_tx();
      }
    }

    shared.ring.publish(&dsp.iq()[..BUF_LEN]);
    shared.ring.publish(&dsp.iq()[BUF_LEN..]);
    *pending = 0;

    if !prepare_next(dsp, current.as_slice(), offset, pending, shared, device, config) {
      if config.no_idle_tx && shared.queue.lock().unwrap().chunks.is_empty() {
        device.lock().unwrap().stop_tx();
      }
      current.clear();
      shared.chunk_active.store(false, Ordering::Release);
      return true;
    }
  }
}

/// Interpolate and modulate the sub-chunk at `offset`, pushing a device
/// sample rate change first when the queued PCM rate demands one.
/// Returns false once the chunk is exhausted.
fn prepare_next<D: Device>(
  dsp: &mut SubChunkDsp,
  current: &[f32],
  offset: &mut usize,
  pending: &mut usize,
  shared: &Shared,
  device: &Mutex<D>,
  config: &Config,
) -> bool {
  if *offset >= current.len() {
    return false;
  }
  let count = config.sub_chunk_samples.min(current.len() - *offset);

  let pcm_rate = shared.queue.lock().unwrap().pcm_rate;
  let rate = device_sample_rate(pcm_rate, config.sub_chunk_samples);
  if shared.device_rate.load(Ordering::Acquire) != rate {
    debug!("transmitter: device sample rate -> {} Hz", rate);
    shared.device_rate.store(rate, Ordering::Release);
    device.lock().unwrap().set_sample_rate(rate);
  }

  dsp.process(&current[*offset..*offset + count], rate);
  *offset += count;
  *pending = count;
  true
}
