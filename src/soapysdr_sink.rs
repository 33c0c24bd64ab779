//! SoapySDR transmit sink.
//!
//! Consumes the sample queue on the radio side: quantised CS8
//! samples are written to an activated TX stream until the queue
//! closes or the pipeline is cancelled.
use log::{debug, info, warn};
use soapysdr::Direction;

use crate::iq_sink::IqWriter;
use crate::sample_queue::SampleQueue;
use crate::{CancellationToken, Error};

/// SoapySDR TX sink builder.
#[derive(Default)]
pub struct SoapySdrSinkBuilder {
    dev: String,
    channel: usize,
    ogain: f64,
    samp_rate: f64,
    freq: f64,
}

impl SoapySdrSinkBuilder {
    /// Create new builder.
    pub fn new(dev: String, freq: f64, samp_rate: f64) -> Self {
        Self {
            dev,
            freq,
            samp_rate,
            ..Default::default()
        }
    }
    /// Set TX gain in dB.
    pub fn ogain(mut self, ogain: f64) -> Self {
        self.ogain = ogain;
        self
    }
    /// Open and configure the device, activate the TX stream.
    pub fn build(self) -> Result<SoapySdrSink, Error> {
        let dev = soapysdr::Device::new(&*self.dev)?;
        debug!("SoapySDR TX driver: {}", dev.driver_key()?);
        debug!("SoapySDR TX hardware: {}", dev.hardware_key()?);
        debug!(
            "SoapySDR TX frontend mapping: {}",
            dev.frontend_mapping(Direction::Tx)?
        );
        debug!(
            "SoapySDR TX channel {} antennas: {:?}",
            self.channel,
            dev.antennas(Direction::Tx, self.channel)?
        );
        debug!(
            "SoapySDR TX channel {} stream formats: {:?}. Native: {:?}",
            self.channel,
            dev.stream_formats(Direction::Tx, self.channel)?,
            dev.native_stream_format(Direction::Tx, self.channel)?,
        );
        dev.set_frequency(
            Direction::Tx,
            self.channel,
            self.freq,
            soapysdr::Args::new(),
        )?;
        dev.set_sample_rate(Direction::Tx, self.channel, self.samp_rate)?;
        dev.set_gain(Direction::Tx, self.channel, self.ogain)?;
        let mut stream = dev.tx_stream(&[self.channel])?;
        stream.activate(None)?;
        info!(
            "SoapySDR TX running at {} MHz, {} S/s",
            self.freq / 1e6,
            self.samp_rate
        );
        Ok(SoapySdrSink { stream })
    }
}

/// Active SoapySDR transmit stream.
pub struct SoapySdrSink {
    stream: soapysdr::TxStream<num_complex::Complex<i8>>,
}

impl SoapySdrSink {
    /// Create a sink builder.
    pub fn builder(dev: &str, freq: f64, samp_rate: f64) -> SoapySdrSinkBuilder {
        SoapySdrSinkBuilder::new(dev.to_string(), freq, samp_rate)
    }

    /// Pump the queue into the radio until the stream ends or the
    /// token is cancelled, then deactivate the TX stream.
    pub fn transmit(
        &mut self,
        queue: &SampleQueue,
        writer: &mut IqWriter,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let timeout_us = 100_000;
        let mut buf = vec![num_complex::Complex::new(0i8, 0i8); 8192];
        'outer: while !cancel.is_canceled() {
            let n = writer.fill_cs8(queue, &mut buf);
            if n == 0 {
                break;
            }
            let mut sent = 0;
            while sent < n {
                if cancel.is_canceled() {
                    break 'outer;
                }
                match self.stream.write(&[&buf[sent..n]], None, false, timeout_us) {
                    Ok(written) => sent += written,
                    Err(e) if e.code == soapysdr::ErrorCode::Timeout => {
                        warn!("SoapySDR TX write timeout");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if n < buf.len() {
                // Queue closed mid-buffer; what was left has been sent.
                break;
            }
        }
        self.stream.deactivate(None)?;
        Ok(())
    }
}

/// Print all SoapySDR devices visible to the driver string.
pub fn list_devices() -> Result<(), Error> {
    for dev in soapysdr::enumerate("")? {
        println!("{dev}");
    }
    Ok(())
}
