//! End-to-end pipeline tests: TS bytes in, samples or I/Q bytes out.
use std::io::Cursor;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use dvbstx::iq_sink::IqWriter;
use dvbstx::modulator::{pump, DvbsModulator};
use dvbstx::sample_queue::{Pop, SampleQueue};
use dvbstx::ts_source::TsPacketSource;
use dvbstx::{CancellationToken, Complex, SYNC_BYTE, TS_PACKET_SIZE};

fn test_modulator() -> DvbsModulator {
    DvbsModulator::new(1_000_000, 2_000_000, 0.35, 41).unwrap()
}

fn packet(fill: u8) -> [u8; TS_PACKET_SIZE] {
    let mut p = [fill; TS_PACKET_SIZE];
    p[0] = SYNC_BYTE;
    p
}

fn ts_stream(count: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for i in 0..count {
        stream.extend_from_slice(&packet(i as u8));
    }
    stream
}

fn drain(queue: &SampleQueue) -> Vec<Complex> {
    let mut samples = Vec::new();
    loop {
        match queue.try_pop() {
            Pop::Sample(s) => samples.push(s),
            Pop::Closed => return samples,
            Pop::Empty => panic!("queue empty but not closed"),
        }
    }
}

#[test]
fn pump_preserves_order_and_count() -> Result<()> {
    // A full superframe plus the packet that restarts it.
    let mut source = TsPacketSource::new(Cursor::new(ts_stream(9)));
    let mut modulator = test_modulator();
    let queue = SampleQueue::new(1 << 16);
    let cancel = CancellationToken::new();

    let packets = pump(&mut source, &mut modulator, &queue, &cancel)?;
    assert_eq!(packets, 9);
    queue.close();
    let samples = drain(&queue);
    assert_eq!(samples.len(), 9 * 3264);

    // Byte-for-byte what the pipeline produces without the queue.
    let mut direct = Vec::new();
    let mut reference = test_modulator();
    for i in 0..9 {
        reference.modulate(&packet(i as u8), &mut direct);
    }
    assert_eq!(samples, direct);
    Ok(())
}

#[test]
fn resyncs_and_keeps_modulating() -> Result<()> {
    let mut stream = Vec::new();
    stream.extend_from_slice(&packet(1));
    stream.extend_from_slice(&[0xff; 97]);
    stream.extend_from_slice(&packet(2));
    stream.extend_from_slice(&packet(3));

    let mut source = TsPacketSource::new(Cursor::new(stream));
    let mut modulator = test_modulator();
    let queue = SampleQueue::new(1 << 16);
    let cancel = CancellationToken::new();

    let packets = pump(&mut source, &mut modulator, &queue, &cancel)?;
    assert_eq!(packets, 3);
    assert!(source.sync_losses() >= 1);
    queue.close();
    assert_eq!(drain(&queue).len(), 3 * 3264);
    Ok(())
}

#[test]
fn file_to_iq_bytes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ts_path = dir.path().join("input.ts");
    std::fs::File::create(&ts_path)?.write_all(&ts_stream(16))?;

    let queue = Arc::new(SampleQueue::new(1 << 16));
    let cancel = CancellationToken::new();
    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        let ts_path = ts_path.clone();
        std::thread::spawn(move || -> Result<u64> {
            let file = std::fs::File::open(&ts_path)?;
            let mut source = TsPacketSource::new(std::io::BufReader::new(file));
            let mut modulator = test_modulator();
            let n = pump(&mut source, &mut modulator, &queue, &cancel)?;
            queue.close();
            Ok(n)
        })
    };
    assert_eq!(producer.join().unwrap()?, 16);

    let mut writer = IqWriter::new(110.0);
    let mut iq = Vec::new();
    let mut buf = vec![0u8; 4096];
    loop {
        let n = writer.fill_bytes(&queue, &mut buf);
        iq.extend_from_slice(&buf[..n]);
        if n < buf.len() {
            break;
        }
    }
    // Two bytes per sample, 3264 samples per packet, no underflows
    // because the queue was drained only after it closed.
    assert_eq!(iq.len(), 16 * 3264 * 2);
    assert_eq!(queue.underflows(), 0);
    // The modulated signal is not silence.
    assert!(iq.iter().any(|&b| b != 0));
    Ok(())
}

#[test]
fn cancellation_stops_a_blocked_producer() -> Result<()> {
    // Queue far smaller than one packet's worth of samples, so the
    // producer is guaranteed to block.
    let queue = Arc::new(SampleQueue::new(256));
    let cancel = CancellationToken::new();
    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        std::thread::spawn(move || -> Result<u64> {
            let mut source = TsPacketSource::new(Cursor::new(ts_stream(64)));
            let mut modulator = test_modulator();
            let n = pump(&mut source, &mut modulator, &queue, &cancel)?;
            queue.close();
            Ok(n)
        })
    };
    std::thread::sleep(std::time::Duration::from_millis(50));
    cancel.cancel();
    let packets = producer.join().unwrap()?;
    assert!(packets < 64);
    Ok(())
}
