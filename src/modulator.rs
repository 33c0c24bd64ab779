/*! The packet-to-samples pipeline.

`DvbsModulator` owns every piece of per-stream state (scrambler
superframe phase, interleaver FIFOs, convolutional register, filter
history) and runs one TS packet through the whole chain:

scramble → RS(204,188) → interleave → convolve → QPSK map → RRC.

All of that state is why the pipeline is sequential: no stage can be
run for packet N+1 before it has seen packet N. The modulator is
created once at startup and must stay on the producer thread.

[`pump`] is the producer loop, feeding a packet source through a
modulator into the shared sample queue until EOF or cancellation.
 */
use log::{debug, info};

use crate::conv_encoder::{ConvEncoder, CODE_BITS_PER_BYTE};
use crate::interleaver::Interleaver;
use crate::qpsk;
use crate::reed_solomon::RsEncoder;
use crate::rrc::RrcFilter;
use crate::sample_queue::SampleQueue;
use crate::scrambler::Scrambler;
use crate::ts_source::TsPacketSource;
use crate::{CancellationToken, Complex, Error, RS_PACKET_SIZE, TS_PACKET_SIZE};

/// Code bits per RS packet after rate-1/2 expansion.
pub const CODE_BITS_PER_PACKET: usize = RS_PACKET_SIZE * CODE_BITS_PER_BYTE;

/// QPSK symbols per TS packet.
pub const SYMBOLS_PER_PACKET: usize = CODE_BITS_PER_PACKET / 2;

/// The full DVB-S modulation pipeline for one transport stream.
pub struct DvbsModulator {
    scrambler: Scrambler,
    rs: RsEncoder,
    interleaver: Interleaver,
    conv: ConvEncoder,
    rrc: RrcFilter,
    // Per-packet scratch, reused to keep the hot path allocation-free.
    bits: Vec<u8>,
    symbols: Vec<Complex>,
}

impl DvbsModulator {
    /// Build the pipeline, deriving every table (PRBS, GF, RS
    /// generator, RRC taps) up front. Fails on an invalid rate or
    /// filter configuration.
    pub fn new(
        symbol_rate: u32,
        sample_rate: u32,
        rolloff: f64,
        ntaps: usize,
    ) -> Result<Self, Error> {
        // Table build order: GF tables and RS generator, then RRC
        // taps, then the PRBS table.
        let rs = RsEncoder::new();
        let rrc = RrcFilter::new(symbol_rate, sample_rate, rolloff, ntaps)?;
        let scrambler = Scrambler::new();
        debug!(
            "Pipeline ready: {symbol_rate} sym/s, {sample_rate} S/s, U={}, {ntaps} taps",
            rrc.upsample()
        );
        Ok(Self {
            scrambler,
            rs,
            interleaver: Interleaver::new(),
            conv: ConvEncoder::new(),
            rrc,
            bits: Vec::with_capacity(CODE_BITS_PER_PACKET),
            symbols: Vec::with_capacity(SYMBOLS_PER_PACKET),
        })
    }

    /// The upsampling factor U.
    #[must_use]
    pub fn upsample(&self) -> usize {
        self.rrc.upsample()
    }

    /// Baseband samples produced per TS packet: 1632 · U.
    #[must_use]
    pub fn samples_per_packet(&self) -> usize {
        SYMBOLS_PER_PACKET * self.rrc.upsample()
    }

    /// Run one packet through every stage, appending the resulting
    /// samples to `out`. The packet must already be sync-aligned.
    pub fn modulate(&mut self, packet: &[u8; TS_PACKET_SIZE], out: &mut Vec<Complex>) {
        let scrambled = self.scrambler.scramble(packet);
        let codeword = self.rs.encode(&scrambled);
        let interleaved = self.interleaver.interleave(&codeword);

        self.bits.clear();
        self.conv.encode(&interleaved, &mut self.bits);

        self.symbols.clear();
        for pair in self.bits.chunks_exact(2) {
            self.symbols.push(qpsk::map_dibit(pair[0], pair[1]));
        }

        self.rrc.filter(&self.symbols, out);
    }
}

/// Producer loop: move packets from `source` through `modulator`
/// into `queue` until end of stream, a read error, or cancellation.
///
/// Returns the number of packets modulated. The caller owns closing
/// the queue, so a looping caller can splice several passes over the
/// same file into one continuous stream.
pub fn pump<R: std::io::Read>(
    source: &mut TsPacketSource<R>,
    modulator: &mut DvbsModulator,
    queue: &SampleQueue,
    cancel: &CancellationToken,
) -> Result<u64, Error> {
    let mut packets = 0u64;
    let mut samples = Vec::with_capacity(modulator.samples_per_packet());
    while !cancel.is_canceled() {
        let packet = match source.next_packet()? {
            Some(p) => p,
            None => break,
        };
        samples.clear();
        modulator.modulate(&packet, &mut samples);
        if !queue.push_slice(&samples, cancel) {
            break;
        }
        packets += 1;
    }
    info!(
        "Producer pass done: {packets} packets, {} sync losses",
        source.sync_losses()
    );
    Ok(packets)
}
