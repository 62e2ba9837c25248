//! Blocking transport adapters for the tinymod RTU engine.
//!
//! The core is sans-I/O; this crate supplies the std-side collaborators: a
//! serial-port link, a monotonic clock, and in-memory stand-ins for both.

#![forbid(unsafe_code)]

pub mod sim;

pub use sim::{PipeLink, RegisterBank};

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tinymod_core::{ByteSink, ByteSource, Clock};
use tracing::{trace, warn};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Serial line settings for an RTU link. 8N1 framing by default.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

/// A byte link over a local serial port.
///
/// The port's own read timeout is kept near zero; all waiting is done by
/// the engine through its clock, so `read_byte` only runs once a byte is
/// already buffered.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud_rate: u32, config: SerialConfig) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .parity(config.parity)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(Duration::from_millis(1))
            .open()?;
        trace!(path, baud_rate, "opened serial link");
        Ok(Self { port })
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl ByteSource for SerialLink {
    fn available(&mut self) -> bool {
        match self.port.bytes_to_read() {
            Ok(count) => count > 0,
            Err(err) => {
                warn!(error = %err, "serial availability check failed");
                false
            }
        }
    }

    fn read_byte(&mut self) -> u8 {
        let mut byte = [0u8; 1];
        match self.port.read_exact(&mut byte) {
            Ok(()) => byte[0],
            Err(err) => {
                // The byte vanished between the availability check and the
                // read. Hand back a zero and let the checksum reject the
                // frame.
                warn!(error = %err, "serial read failed after availability check");
                0
            }
        }
    }
}

impl ByteSink for SerialLink {
    fn write(&mut self, bytes: &[u8]) {
        if let Err(err) = self.port.write_all(bytes).and_then(|()| self.port.flush()) {
            warn!(error = %err, len = bytes.len(), "serial write failed");
            return;
        }
        trace!(len = bytes.len(), "frame written to serial link");
    }
}

/// Wall clock over [`std::time::Instant`], idling in 1 ms sleeps.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn ticks_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn idle(&mut self) {
        std::thread::sleep(Duration::from_millis(1));
    }
}
