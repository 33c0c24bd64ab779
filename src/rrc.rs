/*! Root-raised-cosine pulse shaping with integer upsampling.

The QPSK symbols leave the mapper at the symbol rate; the radio wants
samples at an integer multiple U of that. The RRC filter does both
jobs at once: it band-limits the symbol stream (the receiver applies
the matched other half of the filter) and interpolates to the
sample rate through a polyphase decomposition, so each incoming
symbol costs U dot products over the symbol history instead of a full
convolution at the sample rate.

Taps are derived in f64 from the closed-form RRC impulse response and
normalised so the polyphase-0 tap sum is exactly one, which puts unit
gain at the symbol instants. The hot loop runs in f32.
 */
use crate::{Complex, Error, Float};

/// Compute `ntaps` RRC coefficients for the given rates and roll-off,
/// normalised to unit gain across the polyphase-0 positions
/// (indices 0, U, 2U, …).
///
/// `sample_rate / symbol_rate` must already be an integer; the filter
/// constructor enforces that before calling here.
pub fn rrc_taps(symbol_rate: f64, sample_rate: f64, rolloff: f64, ntaps: usize) -> Vec<f64> {
    use std::f64::consts::PI;
    let ts = 1.0 / symbol_rate;
    let up = (sample_rate / symbol_rate) as usize;
    let mut taps = vec![0.0; ntaps];
    for (i, tap) in taps.iter_mut().enumerate() {
        let t = (i as f64 - (ntaps - 1) as f64 / 2.0) / sample_rate;
        let tt = t / ts;
        *tap = if t == 0.0 {
            (1.0 - rolloff + 4.0 * rolloff / PI) / ts
        } else if ((4.0 * rolloff * tt).abs() - 1.0).abs() < 1e-9 {
            // The generic branch is 0/0 at |t| = T/(4β); use its limit.
            (rolloff / (ts * std::f64::consts::SQRT_2))
                * ((1.0 + 2.0 / PI) * (PI / (4.0 * rolloff)).sin()
                    + (1.0 - 2.0 / PI) * (PI / (4.0 * rolloff)).cos())
        } else {
            let num = (PI * tt * (1.0 - rolloff)).sin()
                + 4.0 * rolloff * tt * (PI * tt * (1.0 + rolloff)).cos();
            let den = PI * tt * (1.0 - (4.0 * rolloff * tt) * (4.0 * rolloff * tt));
            num / den / ts
        };
    }
    let gain: f64 = taps.iter().step_by(up).sum();
    for tap in taps.iter_mut() {
        *tap /= gain;
    }
    taps
}

/// Polyphase RRC interpolating filter, U output samples per symbol.
pub struct RrcFilter {
    taps: Vec<Float>,
    // Most recent symbol at `pos`, older symbols behind it.
    history: Vec<Complex>,
    pos: usize,
    up: usize,
}

impl RrcFilter {
    /// Create a filter.
    ///
    /// Fails unless the sample rate is a positive integer multiple of
    /// the symbol rate and the tap count is odd, which keeps the
    /// group delay at a whole number of samples.
    pub fn new(
        symbol_rate: u32,
        sample_rate: u32,
        rolloff: f64,
        ntaps: usize,
    ) -> Result<Self, Error> {
        if symbol_rate == 0 || sample_rate == 0 {
            return Err(Error::msg("symbol and sample rates must be nonzero"));
        }
        if sample_rate % symbol_rate != 0 {
            return Err(Error::msg(format!(
                "sample rate {sample_rate} is not an integer multiple of symbol rate {symbol_rate}"
            )));
        }
        if ntaps % 2 == 0 {
            return Err(Error::msg(format!("tap count {ntaps} must be odd")));
        }
        let up = (sample_rate / symbol_rate) as usize;
        let taps = rrc_taps(symbol_rate as f64, sample_rate as f64, rolloff, ntaps)
            .into_iter()
            .map(|t| t as Float)
            .collect();
        let hlen = (ntaps - 1) / up + 1;
        Ok(Self {
            taps,
            history: vec![Complex::new(0.0, 0.0); hlen],
            pos: 0,
            up,
        })
    }

    /// The upsampling factor U.
    #[must_use]
    pub fn upsample(&self) -> usize {
        self.up
    }

    /// Filter a run of symbols, appending U samples per symbol to
    /// `out`. Symbol history is kept across calls.
    pub fn filter(&mut self, symbols: &[Complex], out: &mut Vec<Complex>) {
        let hlen = self.history.len();
        out.reserve(symbols.len() * self.up);
        for &sym in symbols {
            self.pos = (self.pos + 1) % hlen;
            self.history[self.pos] = sym;
            for j in 0..self.up {
                let mut acc = Complex::new(0.0, 0.0);
                for (k, &tap) in self.taps[j..].iter().step_by(self.up).enumerate() {
                    acc += self.history[(self.pos + hlen - k) % hlen] * tap;
                }
                out.push(acc);
            }
        }
    }
}
