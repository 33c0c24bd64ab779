/*! Inner convolutional encoder, rate 1/2, K=7.

The standard DVB-S inner code with generators G1 = 171 octal and
G2 = 133 octal, no puncturing. Each input bit produces one (G1, G2)
dibit; a 204-byte interleaved packet becomes 3264 code bits.

Bits are taken from each byte MSB first, and the newest bit enters
the high end of the 7-bit register, so an impulse at the input reads
the generator taps out MSB first, the ordering standard receivers
lock to. The register is never reset once the stream has started.
 */

/// Generator polynomials, 171 and 133 octal.
pub const G1: u8 = 0o171;
pub const G2: u8 = 0o133;

/// Code bits produced per input byte.
pub const CODE_BITS_PER_BYTE: usize = 16;

fn parity(x: u8) -> u8 {
    (x.count_ones() & 1) as u8
}

/// Rate 1/2 convolutional encoder with persistent register state.
pub struct ConvEncoder {
    state: u8,
}

impl ConvEncoder {
    /// Create an encoder with an all-zero register.
    pub fn new() -> Self {
        Self { state: 0 }
    }

    /// Encode a byte stream, appending one (G1, G2) bit pair per
    /// input bit to `out` as bytes in {0, 1}.
    pub fn encode(&mut self, bytes: &[u8], out: &mut Vec<u8>) {
        out.reserve(bytes.len() * CODE_BITS_PER_BYTE);
        for &byte in bytes {
            for shift in (0..8).rev() {
                let bit = (byte >> shift) & 1;
                self.state = (self.state >> 1) | (bit << 6);
                out.push(parity(self.state & G1));
                out.push(parity(self.state & G2));
            }
        }
    }
}

impl Default for ConvEncoder {
    fn default() -> Self {
        Self::new()
    }
}
