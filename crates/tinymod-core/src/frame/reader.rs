//! Byte-by-byte frame reassembly under an inter-byte timeout.

use core::fmt;
use core::time::Duration;

use crate::frame::{crc, shape, Direction, CRC_LEN, HEADER_LEN, MIN_FRAME_LEN};
use crate::registers::StationId;
use crate::transport::{ByteSource, Clock};

/// Gap after which a partially received frame is abandoned.
pub const DEFAULT_INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(10);

/// What kind of frame the reader expects, and on whose behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvMode {
    /// Serving side: a request addressed to `station` or to broadcast.
    Indication { station: StationId },
    /// Requesting side: a response to a request this station sent.
    Confirmation,
}

impl RecvMode {
    const fn direction(self) -> Direction {
        match self {
            Self::Indication { .. } => Direction::Indication,
            Self::Confirmation => Direction::Confirmation,
        }
    }
}

/// Failures local to frame reception. None of these produce a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No byte arrived within the allotted window while more were expected.
    Timeout,
    /// The inferred frame length exceeds the reader's buffer.
    Overrun { needed: usize },
    /// The frame arrived complete but its checksum trailer does not match.
    Checksum { len: usize },
    /// A valid header addressed to another station (indication mode only).
    NotAddressed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("inter-byte timeout"),
            Self::Overrun { needed } => {
                write!(f, "frame of {needed} bytes exceeds the receive buffer")
            }
            Self::Checksum { len } => write!(f, "checksum mismatch in {len}-byte frame"),
            Self::NotAddressed => f.write_str("frame addressed to another station"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// The framing state machine.
///
/// A frame is reassembled in three steps: the station-address and
/// function-code header, then the meta bytes the function shape demands,
/// then the remaining payload plus checksum trailer, whose length is only
/// knowable once the meta bytes are in. Every byte is awaited for at most
/// one inter-byte window; the first byte of a confirmation may use a
/// longer window to give the peer time to serve the request.
#[derive(Debug, Clone, Copy)]
pub struct FrameReader {
    mode: RecvMode,
    inter_byte_timeout: Duration,
    first_byte_timeout: Duration,
}

impl FrameReader {
    pub fn new(mode: RecvMode) -> Self {
        Self {
            mode,
            inter_byte_timeout: DEFAULT_INTER_BYTE_TIMEOUT,
            first_byte_timeout: DEFAULT_INTER_BYTE_TIMEOUT,
        }
    }

    pub fn with_inter_byte_timeout(mut self, timeout: Duration) -> Self {
        self.inter_byte_timeout = timeout;
        self
    }

    pub fn with_first_byte_timeout(mut self, timeout: Duration) -> Self {
        self.first_byte_timeout = timeout;
        self
    }

    /// Read one complete frame into `buf` and return the validated ADU.
    ///
    /// `buf.len()` is the maximum accepted frame size. On
    /// [`FrameError::Overrun`] and [`FrameError::NotAddressed`] the line is
    /// drained to inter-byte silence before returning, so the next poll
    /// starts clean.
    pub fn read<'b, S, C>(
        &self,
        source: &mut S,
        clock: &mut C,
        buf: &'b mut [u8],
    ) -> Result<&'b [u8], FrameError>
    where
        S: ByteSource + ?Sized,
        C: Clock + ?Sized,
    {
        if buf.len() < MIN_FRAME_LEN {
            return Err(FrameError::Overrun {
                needed: MIN_FRAME_LEN,
            });
        }

        let direction = self.mode.direction();
        let mut len = 0usize;

        // Station address and function code.
        while len < HEADER_LEN {
            let window = if len == 0 {
                self.first_byte_timeout
            } else {
                self.inter_byte_timeout
            };
            buf[len] = wait_byte(source, clock, window)?;
            len += 1;

            if len == 1 {
                if let RecvMode::Indication { station } = self.mode {
                    if !station.accepts(buf[0]) {
                        self.drain(source, clock);
                        return Err(FrameError::NotAddressed);
                    }
                }
            }
        }

        // Meta bytes: enough to make the data length knowable.
        let meta = shape::meta_len(buf[1], direction);
        let after_meta = len + meta;
        if after_meta + CRC_LEN > buf.len() {
            self.drain(source, clock);
            return Err(FrameError::Overrun {
                needed: after_meta + CRC_LEN,
            });
        }
        while len < after_meta {
            buf[len] = wait_byte(source, clock, self.inter_byte_timeout)?;
            len += 1;
        }

        // Remaining payload plus checksum trailer.
        let total = len + shape::data_len(&buf[..len], direction) + CRC_LEN;
        if total > buf.len() {
            self.drain(source, clock);
            return Err(FrameError::Overrun { needed: total });
        }
        while len < total {
            buf[len] = wait_byte(source, clock, self.inter_byte_timeout)?;
            len += 1;
        }

        let frame = &buf[..len];
        if !crc::check(frame) {
            return Err(FrameError::Checksum { len });
        }
        Ok(frame)
    }

    /// Discard bytes until the line has been silent for one inter-byte
    /// window.
    fn drain<S, C>(&self, source: &mut S, clock: &mut C)
    where
        S: ByteSource + ?Sized,
        C: Clock + ?Sized,
    {
        while wait_byte(source, clock, self.inter_byte_timeout).is_ok() {}
    }
}

fn wait_byte<S, C>(source: &mut S, clock: &mut C, timeout: Duration) -> Result<u8, FrameError>
where
    S: ByteSource + ?Sized,
    C: Clock + ?Sized,
{
    if source.available() {
        return Ok(source.read_byte());
    }
    let started = clock.ticks_ms();
    let window = timeout.as_millis() as u64;
    loop {
        clock.idle();
        if source.available() {
            return Ok(source.read_byte());
        }
        if clock.ticks_ms().saturating_sub(started) >= window {
            return Err(FrameError::Timeout);
        }
    }
}
