/*! Forney convolutional interleaver, I=12, M=17.

Spreads each RS codeword over time so that a burst of channel errors
lands on many different codewords, each of which the RS outer code
can then repair. Twelve branches: branch 0 passes straight through,
branch i delays by 17·i bytes via a cyclic FIFO.

The interleaver is continuous. State persists across packets and a
packet cannot be interleaved in isolation; on a cold start the FIFOs
are zero-filled and the first ~1122 output bytes contain that fill.
The receiver's deinterleaver absorbs the transient symmetrically.
 */
use crate::RS_PACKET_SIZE;

/// Interleave depth: number of branches.
pub const INTERLEAVE_DEPTH: usize = 12;

/// Bytes of delay added per branch step.
const BRANCH_STEP: usize = RS_PACKET_SIZE / INTERLEAVE_DEPTH;

/// Byte interleaver with per-branch FIFO delay lines.
pub struct Interleaver {
    // fifos[0] stays empty; branch 0 has no delay.
    fifos: Vec<Vec<u8>>,
    cursors: [usize; INTERLEAVE_DEPTH],
}

impl Interleaver {
    /// Create an interleaver with zero-filled delay lines.
    pub fn new() -> Self {
        let fifos = (0..INTERLEAVE_DEPTH)
            .map(|i| vec![0u8; i * BRANCH_STEP])
            .collect();
        Self {
            fifos,
            cursors: [0; INTERLEAVE_DEPTH],
        }
    }

    /// Interleave one RS packet. Input bytes are assigned to
    /// branches round-robin; each delayed branch emits the oldest
    /// byte in its FIFO and stores the new one in its place.
    pub fn interleave(&mut self, packet: &[u8; RS_PACKET_SIZE]) -> [u8; RS_PACKET_SIZE] {
        let mut out = [0u8; RS_PACKET_SIZE];
        for (p, (&b, o)) in packet.iter().zip(out.iter_mut()).enumerate() {
            let branch = p % INTERLEAVE_DEPTH;
            if branch == 0 {
                *o = b;
                continue;
            }
            let fifo = &mut self.fifos[branch];
            let cursor = self.cursors[branch];
            *o = fifo[cursor];
            fifo[cursor] = b;
            self.cursors[branch] = (cursor + 1) % fifo.len();
        }
        out
    }
}

impl Default for Interleaver {
    fn default() -> Self {
        Self::new()
    }
}
