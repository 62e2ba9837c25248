//! Modbus RTU framing, checksum and holding-register dispatch in pure Rust.
//!
//! `tinymod-core` is sans-I/O and `no_std`-compatible: the engine pulls
//! bytes through the capability traits in [`transport`], never allocates,
//! and leaves serial ports, pin wiggling and scheduling to the host.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

pub mod encoding;
pub mod error;
pub mod frame;
pub mod master;
pub mod pdu;
pub mod registers;
pub mod slave;
pub mod transport;

pub use error::{DecodeError, EncodeError};
pub use frame::{FrameError, FrameReader, RecvMode};
pub use master::{Master, MasterConfig, MasterError};
pub use registers::{RegisterTable, StationId};
pub use slave::{Outcome, Slave, SlaveConfig};
pub use transport::{ByteSink, ByteSource, Clock, TxControl};
