/*! Reed-Solomon RS(204,188,T=8) outer coder.

Systematic shortened Reed-Solomon over GF(2^8) with the conventional
DVB-S field (primitive polynomial 0x11d, α = 2). The 188 scrambled
transport bytes pass through unchanged and 16 parity bytes are
appended, enough for the receiver to correct 8 byte errors per
packet.

Both the exp/log tables and the generator polynomial are derived at
construction. Hand-copied generator tables have a history of being
subtly wrong; deriving g(x) = ∏(x − α^i) from the field itself
cannot drift from it.
 */
use crate::{RS_PACKET_SIZE, TS_PACKET_SIZE};

/// Parity bytes per codeword.
pub const PARITY_BYTES: usize = RS_PACKET_SIZE - TS_PACKET_SIZE;

/// GF(2^8) primitive polynomial, x^8 + x^4 + x^3 + x^2 + 1.
const PRIM_POLY: u16 = 0x11d;

/// Log/antilog tables for GF(2^8) multiplication.
///
/// The exp table is extended to 510 so that exp[log a + log b] never
/// needs a reduction mod 255.
struct GfTables {
    exp: [u8; 512],
    log: [u8; 256],
}

impl GfTables {
    fn new() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        for i in 0..255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIM_POLY;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }
        Self { exp, log }
    }

    fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }
}

/// Systematic RS(204,188) encoder.
pub struct RsEncoder {
    gf: GfTables,
    // Non-leading generator coefficients g1..g16.
    generator: [u8; PARITY_BYTES],
}

impl RsEncoder {
    /// Build the field tables and the generator polynomial
    /// g(x) = (x − α^0)(x − α^1)…(x − α^15).
    pub fn new() -> Self {
        let gf = GfTables::new();
        let mut g = [0u8; PARITY_BYTES + 1];
        g[0] = 1;
        for i in 0..PARITY_BYTES {
            let root = gf.exp[i];
            for j in (1..=i + 1).rev() {
                g[j] = gf.mul(g[j], root) ^ g[j - 1];
            }
        }
        let mut generator = [0u8; PARITY_BYTES];
        generator.copy_from_slice(&g[1..]);
        Self { gf, generator }
    }

    /// Encode one packet: the input bytes followed by 16 parity
    /// bytes such that the codeword is divisible by g(x).
    pub fn encode(&self, data: &[u8; TS_PACKET_SIZE]) -> [u8; RS_PACKET_SIZE] {
        let mut out = [0u8; RS_PACKET_SIZE];
        out[..TS_PACKET_SIZE].copy_from_slice(data);

        // Polynomial division with a 16-byte feedback register.
        let mut parity = [0u8; PARITY_BYTES];
        for &d in data.iter() {
            let feedback = d ^ parity[0];
            parity.copy_within(1.., 0);
            parity[PARITY_BYTES - 1] = 0;
            if feedback != 0 {
                for (p, &g) in parity.iter_mut().zip(self.generator.iter()) {
                    *p ^= self.gf.mul(g, feedback);
                }
            }
        }
        out[TS_PACKET_SIZE..].copy_from_slice(&parity);
        out
    }
}

impl Default for RsEncoder {
    fn default() -> Self {
        Self::new()
    }
}
