/*! Scaling and quantisation of baseband samples to 8-bit I/Q.

The modulator emits unit-scale complex samples; SDR front-ends like
the HackRF take interleaved signed 8-bit I and Q. The writer applies
a fixed digital gain chosen to trade output power against clipping,
saturates to the int8 range, and casts.

When the queue runs dry mid-stream the writer repeats the most recent
sample instead of stuffing zeros: a held sample keeps the carrier
envelope continuous while the underflow counter makes the event
visible.
 */
use crate::sample_queue::{Pop, SampleQueue};
use crate::{Complex, Float};

/// Default digital gain, from the usual HackRF deployment.
pub const DEFAULT_DIGITAL_GAIN: Float = 110.0;

/// Quantising consumer-side writer with hold-last-sample underflow
/// behavior.
pub struct IqWriter {
    gain: Float,
    last: Complex,
}

impl IqWriter {
    /// Create a writer with the given digital gain.
    pub fn new(gain: Float) -> Self {
        Self {
            gain,
            last: Complex::new(0.0, 0.0),
        }
    }

    // One scaled sample, or None when the stream is over.
    fn next_pair(&mut self, queue: &SampleQueue) -> Option<(i8, i8)> {
        let s = match queue.try_pop() {
            Pop::Sample(s) => {
                self.last = s;
                s
            }
            Pop::Empty => {
                queue.note_underflow();
                self.last
            }
            Pop::Closed => return None,
        };
        Some((quantize(s.re * self.gain), quantize(s.im * self.gain)))
    }

    /// Fill `buf` with interleaved I/Q bytes (two's complement).
    ///
    /// Returns the number of bytes written; anything short of
    /// `buf.len()` means the queue closed and drained.
    pub fn fill_bytes(&mut self, queue: &SampleQueue, buf: &mut [u8]) -> usize {
        let mut written = 0;
        for pair in buf.chunks_exact_mut(2) {
            match self.next_pair(queue) {
                Some((i, q)) => {
                    pair[0] = i as u8;
                    pair[1] = q as u8;
                    written += 2;
                }
                None => break,
            }
        }
        written
    }

    /// Fill `buf` with complex int8 samples (the CS8 wire format).
    ///
    /// Returns the number of samples written; anything short of
    /// `buf.len()` means the queue closed and drained.
    pub fn fill_cs8(&mut self, queue: &SampleQueue, buf: &mut [num_complex::Complex<i8>]) -> usize {
        let mut written = 0;
        for out in buf.iter_mut() {
            match self.next_pair(queue) {
                Some((i, q)) => {
                    *out = num_complex::Complex::new(i, q);
                    written += 1;
                }
                None => break,
            }
        }
        written
    }
}

fn quantize(x: Float) -> i8 {
    x.clamp(-128.0, 127.0) as i8
}
