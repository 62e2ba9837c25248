//! RTU frame (ADU) layout and framing.
//!
//! On the wire an ADU is `[address][function][payload...][crc_lo][crc_hi]`.
//! Payload fields are big-endian; the checksum trailer carries the low byte
//! of the CRC first.

pub mod crc;
pub mod reader;
pub mod shape;
pub mod writer;

pub use reader::{FrameError, FrameReader, RecvMode};
pub use shape::Direction;
pub use writer::send_frame;

/// Largest ADU this implementation will frame by default.
pub const MAX_FRAME_LEN: usize = 256;

/// Station address plus function code.
pub const HEADER_LEN: usize = 2;

/// Checksum trailer length.
pub const CRC_LEN: usize = 2;

/// Smallest complete frame: header plus trailer.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;
