/*!
DVB-S transmitter: modulate an MPEG transport stream file and send
the baseband samples to an SDR, or write interleaved 8-bit I/Q to a
file for offline use.
 */
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use dvbstx::iq_sink::{IqWriter, DEFAULT_DIGITAL_GAIN};
use dvbstx::modulator::{pump, DvbsModulator};
use dvbstx::sample_queue::SampleQueue;
use dvbstx::ts_source::TsPacketSource;
use dvbstx::{CancellationToken, Float};

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Verbosity of debug messages.
    #[arg(short, long, default_value_t = 0)]
    verbose: usize,

    /// Input MPEG transport stream file.
    #[arg(long)]
    input: Option<std::path::PathBuf>,

    /// Write interleaved signed 8-bit I/Q to this file instead of
    /// transmitting.
    #[arg(long)]
    output: Option<std::path::PathBuf>,

    /// soapysdr driver string, e.g. "driver=hackrf".
    #[cfg(feature = "soapysdr")]
    #[arg(long)]
    driver: Option<String>,

    /// List SDR devices.
    #[cfg(feature = "soapysdr")]
    #[arg(long)]
    list_devices: bool,

    /// Transmit frequency in MHz.
    #[arg(long, default_value_t = 1280.0)]
    freq: f64,

    /// TX gain in dB.
    #[arg(long, default_value_t = 30.0)]
    gain: f64,

    /// Digital gain applied before the int8 cast.
    #[arg(long, default_value_t = DEFAULT_DIGITAL_GAIN)]
    digital_gain: Float,

    /// Symbol rate in symbols per second.
    #[arg(long, default_value_t = 1_000_000)]
    symbol_rate: u32,

    /// Sample rate on the RF side; must be an integer multiple of
    /// the symbol rate.
    #[arg(long, default_value_t = 2_000_000)]
    sample_rate: u32,

    /// RRC roll-off factor.
    #[arg(long, default_value_t = 0.35)]
    rolloff: f64,

    /// RRC filter length; must be odd.
    #[arg(long, default_value_t = 41)]
    ntaps: usize,

    /// Sample queue capacity.
    #[arg(long, default_value_t = 1 << 21)]
    queue_size: usize,

    /// Loop the input file forever.
    #[arg(long)]
    repeat: bool,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("dvbstx")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    #[cfg(feature = "soapysdr")]
    if opt.list_devices {
        return Ok(dvbstx::soapysdr_sink::list_devices()?);
    }

    let input = opt
        .input
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--input is required"))?;

    let modulator = DvbsModulator::new(opt.symbol_rate, opt.sample_rate, opt.rolloff, opt.ntaps)?;
    info!(
        "Modulating {} at {} sym/s → {} S/s (U={})",
        input.display(),
        opt.symbol_rate,
        opt.sample_rate,
        modulator.upsample()
    );

    let queue = Arc::new(SampleQueue::new(opt.queue_size));
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("Got Ctrl-C");
            cancel.cancel();
        })
        .expect("failed to set Ctrl-C handler");
    }

    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        let repeat = opt.repeat;
        let mut modulator = modulator;
        std::thread::Builder::new()
            .name("modulator".to_string())
            .spawn(move || -> Result<(u64, u64)> {
                let mut packets = 0u64;
                let mut sync_losses = 0u64;
                loop {
                    let file = std::fs::File::open(&input)?;
                    let mut source = TsPacketSource::new(std::io::BufReader::new(file));
                    let n = pump(&mut source, &mut modulator, &queue, &cancel)?;
                    packets += n;
                    sync_losses += source.sync_losses();
                    if !repeat || cancel.is_canceled() {
                        break;
                    }
                    if n == 0 {
                        warn!("Input produced no packets; not repeating");
                        break;
                    }
                }
                queue.close();
                Ok((packets, sync_losses))
            })?
    };

    // Give the radio some headroom before the transfer starts.
    queue.wait_level(opt.queue_size / 2, &cancel);

    let mut writer = IqWriter::new(opt.digital_gain);
    let sink_result = match &opt.output {
        Some(path) => write_iq_file(path, &mut writer, &queue, &cancel),
        None => {
            #[cfg(feature = "soapysdr")]
            {
                transmit_radio(&opt, &mut writer, &queue, &cancel)
            }
            #[cfg(not(feature = "soapysdr"))]
            {
                Err(anyhow::anyhow!(
                    "need --output (built without soapysdr support)"
                ))
            }
        }
    };

    // Whether the sink finished, failed, or was interrupted: set the
    // token, join the producer, then report.
    cancel.cancel();
    let produced = producer.join().expect("joining modulator thread");
    sink_result?;
    let (packets, sync_losses) = produced?;
    info!(
        "Done: {packets} packets, {sync_losses} sync losses, {} queue underflows",
        queue.underflows()
    );
    Ok(())
}

fn write_iq_file(
    path: &std::path::Path,
    writer: &mut IqWriter,
    queue: &SampleQueue,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut buf = vec![0u8; 16384];
    while !cancel.is_canceled() {
        // A file has no realtime deadline; wait for samples instead
        // of padding with the underflow substitute.
        queue.wait_level(buf.len() / 2, cancel);
        let n = writer.fill_bytes(queue, &mut buf);
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        if n < buf.len() {
            break;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(feature = "soapysdr")]
fn transmit_radio(
    opt: &Opt,
    writer: &mut IqWriter,
    queue: &SampleQueue,
    cancel: &CancellationToken,
) -> Result<()> {
    let driver = opt
        .driver
        .clone()
        .ok_or_else(|| anyhow::anyhow!("need --driver or --output"))?;
    let mut sink = dvbstx::soapysdr_sink::SoapySdrSink::builder(
        &driver,
        1_000_000.0 * opt.freq,
        opt.sample_rate as f64,
    )
    .ogain(opt.gain)
    .build()?;
    sink.transmit(queue, writer, cancel)?;
    Ok(())
}
