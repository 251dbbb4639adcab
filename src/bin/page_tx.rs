use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use pocsag_tx::device::MockDevice;
use pocsag_tx::pcm_source::PcmSource;
use pocsag_tx::pocsag::{Bps, Charset, DateTimePosition, Encoder, Function, MessageType};
use pocsag_tx::transmitter::Transmitter;

/// Encode a pager message and stream it as FM IQ to the transmitter.
///
/// The SDR driver itself is out of scope here; the mock device stands in
/// for it and drains the same callback a HackRF would.
#[derive(Parser, Debug)]
#[command(name = "page_tx", version, about)]
struct Opt {
  /// RIC of the receiving pager
  #[arg(long, default_value_t = 1234567)]
  address: u32,

  /// message text
  #[arg(long, default_value = "Hello World!")]
  message: String,

  /// POCSAG speed: 512, 1200 or 2400
  #[arg(long, default_value_t = 512)]
  bps: u16,

  /// carrier frequency in Hz
  #[arg(long, default_value_t = 141_225_000)]
  frequency: u64,

  /// TX VGA gain
  #[arg(long, default_value_t = 40.0)]
  gain: f32,

  /// FM deviation in kHz
  #[arg(long, default_value_t = 25.0)]
  deviation_khz: f64,

  /// input PCM samples consumed per tick
  #[arg(long, default_value_t = 4096)]
  sub_chunk: usize,

  /// stamp the transmission time into the message
  #[arg(long)]
  date: bool,

  #[arg(long, default_value_t = 0)]
  verbose: usize,
}

fn main() -> Result<()> {
  let opt = Opt::parse();
  stderrlog::new()
    .module(module_path!())
    .module("pocsag_tx")
    .verbosity(opt.verbose)
    .init()?;

  let bps = match opt.bps {
    512 => Bps::Bps512,
    1200 => Bps::Bps1200,
    2400 => Bps::Bps2400,
    other => bail!("{} is not a POCSAG bit rate", other),
  };

  let mut encoder = Encoder::new();
  encoder.set_amplitude(8000);
  if opt.date {
    encoder.set_date_time_position(DateTimePosition::Begin);
  }
  let encoded = encoder.encode(
    opt.address,
    MessageType::Alphanumeric,
    opt.message.as_bytes(),
    bps,
    Charset::Latin,
    Function::A,
    false,
  )?;
  eprintln!("encoded {} PCM samples", encoded.count);

  let source = PcmSource::from_wav_bytes(&encoded.bytes)?;
  let mut tx = Transmitter::new(MockDevice::new())?;
  tx.set_sub_chunk_samples(opt.sub_chunk)?;
  tx.set_frequency(opt.frequency)?;
  tx.set_fm_deviation_khz(opt.deviation_khz)?;
  tx.set_gain_rf(opt.gain)?;
  tx.set_amp(true)?;
  tx.push_samples(&source);

  if !tx.start() {
    bail!("failed to start TX");
  }
  eprintln!("transmitting at {} Hz, device rate {} Hz", opt.frequency, tx.device_sample_rate());

  if !tx.wait_for_idle(Duration::from_secs(600)) {
    bail!("transmission did not finish in time");
  }
  tx.stop()?;
  eprintln!("done");
  Ok(())
}
