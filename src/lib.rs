/*! DVB-S baseband modulator.

This crate turns an MPEG transport stream into complex baseband
samples carrying a QPSK-modulated, rate-1/2 forward-error-corrected
DVB-S signal (ETSI EN 300 421), ready for an SDR transmit front-end.

# Architecture overview

The signal path is one straight line. Every stage carries state that
must evolve packet after packet, so there is no useful parallelism
inside the pipeline; it runs on a single producer thread and hands
finished samples to the radio through a bounded queue.

```text
   [ TS packet source, resync on 0x47 ]
                  ↓
   [ Energy dispersal scrambler ]
                  ↓
   [ Reed-Solomon RS(204,188) ]
                  ↓
   [ Convolutional interleaver I=12 ]
                  ↓
   [ Rate 1/2 K=7 convolutional encoder ]
                  ↓
   [ QPSK mapper ]
                  ↓
   [ Root-raised-cosine upsampling filter ]
                  ↓
   [ Bounded sample queue ]
                  ↓
   [ I/Q quantiser → SDR or file ]
```

# Example

```
use dvbstx::modulator::DvbsModulator;

let mut modulator = DvbsModulator::new(1_000_000, 2_000_000, 0.35, 41)?;
let mut packet = [0u8; 188];
packet[0] = 0x47;
let mut samples = Vec::new();
modulator.modulate(&packet, &mut samples);
assert_eq!(samples.len(), modulator.samples_per_packet());
# Ok::<(), dvbstx::Error>(())
```
 */
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod conv_encoder;
pub mod interleaver;
pub mod iq_sink;
pub mod modulator;
pub mod qpsk;
pub mod reed_solomon;
pub mod rrc;
pub mod sample_queue;
pub mod scrambler;
pub mod ts_source;

#[cfg(feature = "soapysdr")]
pub mod soapysdr_sink;

/// Float type used. Usually f32, but not guaranteed.
pub type Float = f32;

/// Complex (I/Q) data.
pub type Complex = num_complex::Complex<Float>;

/// Transport stream packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// Reed-Solomon codeword size in bytes: the TS packet plus parity.
pub const RS_PACKET_SIZE: usize = 204;

/// First byte of every transport stream packet.
pub const SYNC_BYTE: u8 = 0x47;

/// Packets per superframe; the scrambler resets on this period.
pub const SUPERFRAME_PACKETS: usize = 8;

/// Modulator error.
#[derive(Debug, Clone)]
pub struct Error {
    msg: String,
}

impl Error {
    /// Create error from message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "dvbstx error: {}", self.msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::msg(format!("IO error: {e}"))
    }
}

#[cfg(feature = "soapysdr")]
impl From<soapysdr::Error> for Error {
    fn from(e: soapysdr::Error) -> Self {
        Self::msg(format!("SoapySDR error: {e}"))
    }
}

/// Token for asynchronously stopping the pipeline, for example when
/// the user presses Ctrl-C.
///
/// Clones share the same flag, so the shutdown path can hand one copy
/// to a signal handler and keep another for the worker threads.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }
    /// Mark the token cancelled.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }
    /// Return whether the token has been cancelled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_shared() {
        let t = CancellationToken::new();
        let t2 = t.clone();
        assert!(!t.is_canceled());
        t2.cancel();
        assert!(t.is_canceled());
    }
}
