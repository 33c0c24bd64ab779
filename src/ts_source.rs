/*! Transport stream packet framing.

Cuts a byte stream into 188-byte TS packets and keeps the cut aligned
on the 0x47 sync byte. A mid-stream byte that should be a sync but is
not means the source lost lock (dropped bytes upstream, a truncated
write, a bad splice); the reader discards bytes until 0x47 lands on a
packet boundary again, logs the event, and carries on.
 */
use std::io::Read;

use log::{debug, warn};

use crate::{Error, SYNC_BYTE, TS_PACKET_SIZE};

/// TS packet reader over any byte source.
pub struct TsPacketSource<R> {
    reader: R,
    sync_losses: u64,
}

impl<R: Read> TsPacketSource<R> {
    /// Create a packet source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            sync_losses: 0,
        }
    }

    /// Number of sync-loss events seen so far.
    #[must_use]
    pub fn sync_losses(&self) -> u64 {
        self.sync_losses
    }

    // Fill buf[offset..]; Ok(false) on clean EOF before any byte.
    fn fill(&mut self, buf: &mut [u8; TS_PACKET_SIZE], offset: usize) -> Result<bool, Error> {
        let mut have = offset;
        while have < TS_PACKET_SIZE {
            let n = self.reader.read(&mut buf[have..])?;
            if n == 0 {
                if have > 0 {
                    debug!("Discarding {have} trailing bytes at EOF");
                }
                return Ok(false);
            }
            have += n;
        }
        Ok(true)
    }

    /// Read the next sync-aligned packet, or `None` at end of stream.
    pub fn next_packet(&mut self) -> Result<Option<[u8; TS_PACKET_SIZE]>, Error> {
        let mut buf = [0u8; TS_PACKET_SIZE];
        if !self.fill(&mut buf, 0)? {
            return Ok(None);
        }
        while buf[0] != SYNC_BYTE {
            self.sync_losses += 1;
            warn!("TS sync lost, searching for 0x47");
            match buf.iter().position(|&b| b == SYNC_BYTE) {
                Some(skip) => {
                    buf.copy_within(skip.., 0);
                    if !self.fill(&mut buf, TS_PACKET_SIZE - skip)? {
                        return Ok(None);
                    }
                }
                None => {
                    if !self.fill(&mut buf, 0)? {
                        return Ok(None);
                    }
                }
            }
        }
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn packet(fill: u8) -> [u8; TS_PACKET_SIZE] {
        let mut p = [fill; TS_PACKET_SIZE];
        p[0] = SYNC_BYTE;
        p
    }

    #[test]
    fn reads_aligned_packets() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&packet(1));
        stream.extend_from_slice(&packet(2));
        let mut src = TsPacketSource::new(Cursor::new(stream));
        assert_eq!(src.next_packet().unwrap(), Some(packet(1)));
        assert_eq!(src.next_packet().unwrap(), Some(packet(2)));
        assert_eq!(src.next_packet().unwrap(), None);
        assert_eq!(src.sync_losses(), 0);
    }

    #[test]
    fn resyncs_after_garbage() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&packet(1));
        stream.extend_from_slice(&[0xff; 50]);
        stream.extend_from_slice(&packet(2));
        stream.extend_from_slice(&packet(3));
        let mut src = TsPacketSource::new(Cursor::new(stream));
        assert_eq!(src.next_packet().unwrap(), Some(packet(1)));
        assert_eq!(src.next_packet().unwrap(), Some(packet(2)));
        assert_eq!(src.next_packet().unwrap(), Some(packet(3)));
        assert!(src.sync_losses() >= 1);
    }

    #[test]
    fn garbage_without_sync_is_skipped_whole() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0xff; TS_PACKET_SIZE]);
        stream.extend_from_slice(&packet(9));
        let mut src = TsPacketSource::new(Cursor::new(stream));
        assert_eq!(src.next_packet().unwrap(), Some(packet(9)));
    }

    #[test]
    fn truncated_tail_is_eof() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&packet(1));
        stream.extend_from_slice(&packet(2)[..100]);
        let mut src = TsPacketSource::new(Cursor::new(stream));
        assert_eq!(src.next_packet().unwrap(), Some(packet(1)));
        assert_eq!(src.next_packet().unwrap(), None);
    }
}
