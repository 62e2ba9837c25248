//! Per-function frame shape rules.
//!
//! RTU frames carry no length field; how many bytes follow the function
//! code must be inferred from the function code itself and, for the
//! variable-length functions, from a handful of *meta* bytes that precede
//! the payload. The rules differ by direction because requests count
//! registers while most replies count payload bytes.

/// Which half of a request/response exchange a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// A request as seen by the serving station.
    Indication,
    /// A response as seen by the requesting station.
    Confirmation,
}

/// Number of bytes after the function code needed before the remaining
/// data length is knowable.
pub fn meta_len(function: u8, direction: Direction) -> usize {
    match direction {
        Direction::Indication => match function {
            // Fixed-shape requests: start address plus count or value.
            0x01..=0x06 => 4,
            // Write-multiple requests: address, count, byte count.
            0x0F | 0x10 => 5,
            // Read/write combined: both address/count pairs, byte count.
            0x17 => 9,
            // 0x07, 0x11 and anything unknown: bare function code.
            _ => 0,
        },
        Direction::Confirmation => match function {
            // Write acknowledgements echo address and count/value.
            0x05 | 0x06 | 0x0F | 0x10 => 4,
            // Everything else, exceptions included, leads with one byte:
            // a byte count or an exception code.
            _ => 1,
        },
    }
}

/// Remaining data length once the meta bytes of `msg` (a frame prefix of
/// header plus meta) have been read. Excludes the checksum trailer.
pub fn data_len(msg: &[u8], direction: Direction) -> usize {
    let function = msg[1];
    match direction {
        Direction::Indication => match function {
            0x0F | 0x10 => usize::from(msg[6]),
            0x17 => usize::from(msg[10]),
            _ => 0,
        },
        Direction::Confirmation => match function {
            0x01..=0x04 | 0x11 | 0x17 => usize::from(msg[2]),
            _ => 0,
        },
    }
}
