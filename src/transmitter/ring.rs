use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::default_config::DefaultConfig;

/// bytes in one ring slot: one quantized half of an IQ sub-chunk
pub(crate) const SLOT_BYTES: usize = DefaultConfig::BUF_LEN;

struct RingState {
  slots: Vec<Vec<i8>>,
  head: usize,
  tail: usize,
  fill: usize,
  /// raised when the consumer drained the ring to empty; the producer only
  /// prepares the next sub-chunk once this is up
  ready: bool,
}

/// 256-slot single-producer single-consumer ring between the modulator
/// worker and the device callback. The producer publishes quantized IQ
/// halves, the callback drains them in FIFO order or writes silence when
/// the ring is empty.
pub(crate) struct SlotRing {
  state: Mutex<RingState>,
  drained: Condvar,
}

impl SlotRing {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(RingState {
        slots: vec![vec![0; SLOT_BYTES]; DefaultConfig::BUF_NUM],
        head: 0,
        tail: 0,
        fill: 0,
        ready: true,
      }),
      drained: Condvar::new(),
    }
  }

  /// quantize one half of the IQ float buffer into the slot at `head`.
  pub fn publish(&self, iq: &[f32]) {
    debug_assert_eq!(iq.len(), SLOT_BYTES);
    let mut st = self.state.lock().unwrap();
    debug_assert!(st.fill < DefaultConfig::BUF_NUM);
    st.ready = false;

    let head = st.head;
    for (dst, &x) in st.slots[head].iter_mut().zip(iq) {
      *dst = (x * 127.0).round().clamp(-128.0, 127.0) as i8;
    }
    st.head = (head + 1) % DefaultConfig::BUF_NUM;
    st.fill += 1;
  }

  /// Drain one slot into `dst`, or zero-fill it when the ring is empty.
  /// Never blocks: this runs on the device driver thread.
  pub fn drain(&self, dst: &mut [i8]) {
    let mut st = self.state.lock().unwrap();
    if st.fill == 0 {
      dst.fill(0);
      return;
    }

    let tail = st.tail;
    let n = dst.len().min(SLOT_BYTES);
    dst[..n].copy_from_slice(&st.slots[tail][..n]);
    st.tail = (tail + 1) % DefaultConfig::BUF_NUM;
    st.fill -= 1;
    if st.fill == 0 {
      st.ready = true;
      self.drained.notify_one();
    }
  }

  /// Block until the consumer drained the ring, checking `stop` while
  /// waiting. Returns false when interrupted by `stop`.
  pub fn wait_ready(&self, stop: &AtomicBool) -> bool {
    let mut st = self.state.lock().unwrap();
    while !st.ready {
      if stop.load(Ordering::Acquire) {
        return false;
      }
      let (guard, _) = self.drained.wait_timeout(st, Duration::from_millis(10)).unwrap();
      st = guard;
    }
    true
  }

  /// raise the ready flag, part of the transmitter start sequence
  pub fn set_ready(&self) {
    self.state.lock().unwrap().ready = true;
  }

  #[cfg(test)]
  pub fn fill(&self) -> usize {
    self.state.lock().unwrap().fill
  }
}
