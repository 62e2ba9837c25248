//! Capability traits the engine needs from its host.
//!
//! The core never touches a serial port directly. A host hands it a byte
//! source/sink pair (a UART, an in-memory pipe, a socket) and a clock, and
//! the engine does the rest. All traits are object-safe.

/// Receive side of a half-duplex byte link.
pub trait ByteSource {
    /// Whether at least one byte can be taken without waiting.
    fn available(&mut self) -> bool;

    /// Take the next byte.
    ///
    /// Only called after [`available`](Self::available) returned `true`; the
    /// engine never uses this method to wait.
    fn read_byte(&mut self) -> u8;
}

/// Transmit side of a half-duplex byte link.
pub trait ByteSink {
    /// Queue a complete frame for transmission.
    fn write(&mut self, bytes: &[u8]);
}

/// Monotonic time source driving the inter-byte timeout.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn ticks_ms(&self) -> u64;

    /// Cooperative suspension point between availability polls.
    ///
    /// May sleep for a tick, yield to a scheduler, or advance a simulated
    /// clock. Must not block past the order of a millisecond.
    fn idle(&mut self);
}

/// Transceiver direction control for half-duplex RS-485 links.
///
/// The frame writer brackets every transmission with these hooks so a host
/// can assert the driver-enable line around the byte burst. Turnaround
/// compensation belongs to the implementor. The unit type is the no-op
/// control for links that need none.
pub trait TxControl {
    fn before_transmit(&mut self) {}
    fn after_transmit(&mut self) {}
}

impl TxControl for () {}
