//! The requesting side: build a request, send it, await the confirmation.

use core::fmt;
use core::time::Duration;

use crate::encoding::{Reader, Writer};
use crate::frame::reader::DEFAULT_INTER_BYTE_TIMEOUT;
use crate::frame::{send_frame, FrameError, FrameReader, RecvMode, CRC_LEN, MAX_FRAME_LEN};
use crate::pdu::{
    ExceptionResponse, ReadHoldingRegistersRequest, Response, WriteMultipleRegistersRequest,
};
use crate::registers::StationId;
use crate::transport::{ByteSink, ByteSource, Clock, TxControl};
use crate::{DecodeError, EncodeError};

/// How long a station gets to start answering before the exchange is
/// abandoned.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct MasterConfig {
    pub response_timeout: Duration,
    pub inter_byte_timeout: Duration,
    pub max_frame_len: usize,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            inter_byte_timeout: DEFAULT_INTER_BYTE_TIMEOUT,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl MasterConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_inter_byte_timeout(mut self, timeout: Duration) -> Self {
        self.inter_byte_timeout = timeout;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterError {
    /// The confirmation never framed: timeout, overrun or corruption.
    Frame(FrameError),
    Encode(EncodeError),
    Decode(DecodeError),
    /// The station answered with an exception reply.
    Exception(ExceptionResponse),
    /// A well-formed confirmation arrived from the wrong station.
    UnexpectedStation { expected: u8, got: u8 },
    InvalidRequest(&'static str),
    InvalidResponse(&'static str),
}

impl fmt::Display for MasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(err) => write!(f, "frame error: {err}"),
            Self::Encode(err) => write!(f, "encode error: {err}"),
            Self::Decode(err) => write!(f, "decode error: {err}"),
            Self::Exception(ex) => write!(
                f,
                "modbus exception: function 0x{:02X} code 0x{:02X}",
                ex.function_code,
                ex.exception_code.as_u8()
            ),
            Self::UnexpectedStation { expected, got } => {
                write!(f, "response from station {got}, expected {expected}")
            }
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FrameError> for MasterError {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

impl From<EncodeError> for MasterError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<DecodeError> for MasterError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

/// A polling RTU client for a two-party serial link.
pub struct Master<L, C, X = ()> {
    link: L,
    clock: C,
    tx: X,
    config: MasterConfig,
}

impl<L, C> Master<L, C>
where
    L: ByteSource + ByteSink,
    C: Clock,
{
    pub fn new(link: L, clock: C) -> Self {
        Self::with_config(link, clock, MasterConfig::default())
    }

    pub fn with_config(link: L, clock: C, config: MasterConfig) -> Self {
        Self::with_tx_control(link, clock, (), config)
    }
}

impl<L, C, X> Master<L, C, X>
where
    L: ByteSource + ByteSink,
    C: Clock,
    X: TxControl,
{
    pub fn with_tx_control(link: L, clock: C, tx: X, config: MasterConfig) -> Self {
        Self {
            link,
            clock,
            tx,
            config,
        }
    }

    pub const fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Read `out.len()` holding registers starting at `start` from
    /// `station`, filling `out` in ascending address order.
    pub fn read_holding_registers(
        &mut self,
        station: StationId,
        start: u16,
        out: &mut [u16],
    ) -> Result<(), MasterError> {
        if station.is_broadcast() {
            return Err(MasterError::InvalidRequest("cannot read via broadcast"));
        }
        let quantity =
            u16::try_from(out.len()).map_err(|_| EncodeError::ValueOutOfRange)?;
        let request = ReadHoldingRegistersRequest {
            start_address: start,
            quantity,
        };

        let mut frame_buf = [0u8; MAX_FRAME_LEN];
        let mut adu = Writer::new(&mut frame_buf);
        adu.write_u8(station.as_u8())?;
        request.encode(&mut adu)?;
        send_frame(&mut self.link, &mut self.tx, &mut adu)?;

        let mut response_buf = [0u8; MAX_FRAME_LEN];
        match receive(
            &mut self.link,
            &mut self.clock,
            &self.config,
            station,
            &mut response_buf,
        )? {
            Response::ReadHoldingRegisters(data) => {
                if data.register_count() != out.len() {
                    return Err(MasterError::InvalidResponse("register count mismatch"));
                }
                for (slot, bytes) in out.iter_mut().zip(data.data.chunks_exact(2)) {
                    *slot = u16::from_be_bytes([bytes[0], bytes[1]]);
                }
                Ok(())
            }
            _ => Err(MasterError::InvalidResponse("unexpected function response")),
        }
    }

    /// Write `values` to consecutive holding registers starting at `start`.
    ///
    /// A broadcast write is fire-and-forget: the frame goes out and no
    /// confirmation is awaited, since no station may answer broadcast.
    pub fn write_multiple_registers(
        &mut self,
        station: StationId,
        start: u16,
        values: &[u16],
    ) -> Result<(), MasterError> {
        let request = WriteMultipleRegistersRequest {
            start_address: start,
            values,
        };
        let expected_quantity = request.quantity()?;

        let mut frame_buf = [0u8; MAX_FRAME_LEN];
        let mut adu = Writer::new(&mut frame_buf);
        adu.write_u8(station.as_u8())?;
        request.encode(&mut adu)?;
        send_frame(&mut self.link, &mut self.tx, &mut adu)?;

        if station.is_broadcast() {
            return Ok(());
        }

        let mut response_buf = [0u8; MAX_FRAME_LEN];
        match receive(
            &mut self.link,
            &mut self.clock,
            &self.config,
            station,
            &mut response_buf,
        )? {
            Response::WriteMultipleRegisters(resp)
                if resp.start_address == start && resp.quantity == expected_quantity =>
            {
                Ok(())
            }
            Response::WriteMultipleRegisters(_) => Err(MasterError::InvalidResponse(
                "write acknowledgement echo mismatch",
            )),
            _ => Err(MasterError::InvalidResponse("unexpected function response")),
        }
    }
}

/// Read and decode one confirmation frame from `station`.
fn receive<'b, L, C>(
    link: &mut L,
    clock: &mut C,
    config: &MasterConfig,
    station: StationId,
    buf: &'b mut [u8],
) -> Result<Response<'b>, MasterError>
where
    L: ByteSource + ?Sized,
    C: Clock + ?Sized,
{
    let max = config.max_frame_len.min(buf.len());
    let reader = FrameReader::new(RecvMode::Confirmation)
        .with_inter_byte_timeout(config.inter_byte_timeout)
        .with_first_byte_timeout(config.response_timeout);

    let frame = reader.read(link, clock, &mut buf[..max])?;
    if frame[0] != station.as_u8() {
        return Err(MasterError::UnexpectedStation {
            expected: station.as_u8(),
            got: frame[0],
        });
    }

    let mut r = Reader::new(&frame[1..frame.len() - CRC_LEN]);
    let response = Response::decode(&mut r)?;
    if !r.is_empty() {
        return Err(MasterError::InvalidResponse("trailing bytes in response"));
    }
    if let Response::Exception(ex) = response {
        return Err(MasterError::Exception(ex));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::{Master, MasterError};
    use crate::frame::{crc, FrameError};
    use crate::pdu::ExceptionCode;
    use crate::registers::StationId;
    use crate::transport::{ByteSink, ByteSource, Clock};

    struct TestLink {
        rx: Vec<u8>,
        pos: usize,
        tx: Vec<u8>,
    }

    impl TestLink {
        fn new(rx: &[u8]) -> Self {
            Self {
                rx: rx.to_vec(),
                pos: 0,
                tx: Vec::new(),
            }
        }
    }

    impl ByteSource for TestLink {
        fn available(&mut self) -> bool {
            self.pos < self.rx.len()
        }

        fn read_byte(&mut self) -> u8 {
            let byte = self.rx[self.pos];
            self.pos += 1;
            byte
        }
    }

    impl ByteSink for TestLink {
        fn write(&mut self, bytes: &[u8]) {
            self.tx.extend_from_slice(bytes);
        }
    }

    struct StepClock {
        now_ms: u64,
    }

    impl Clock for StepClock {
        fn ticks_ms(&self) -> u64 {
            self.now_ms
        }

        fn idle(&mut self) {
            self.now_ms += 1;
        }
    }

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc::trailer(crc::crc16(body)));
        frame
    }

    fn master(confirmation: &[u8]) -> Master<TestLink, StepClock> {
        Master::new(TestLink::new(confirmation), StepClock { now_ms: 0 })
    }

    fn station(address: u8) -> StationId {
        StationId::new(address).unwrap()
    }

    #[test]
    fn read_holding_registers_roundtrip() {
        let confirmation = framed(&[0x01, 0x03, 0x06, 0x00, 0x14, 0x00, 0x1E, 0x00, 0x28]);
        let mut master = master(&confirmation);

        let mut out = [0u16; 3];
        master
            .read_holding_registers(station(1), 0x0001, &mut out)
            .unwrap();
        assert_eq!(out, [20, 30, 40]);

        let expected_request = framed(&[0x01, 0x03, 0x00, 0x01, 0x00, 0x03]);
        assert_eq!(master.link.tx, expected_request);
    }

    #[test]
    fn write_multiple_registers_roundtrip() {
        let confirmation = framed(&[0x01, 0x10, 0x00, 0x02, 0x00, 0x02]);
        let mut master = master(&confirmation);

        master
            .write_multiple_registers(station(1), 0x0002, &[7, 9])
            .unwrap();

        let expected_request = framed(&[
            0x01, 0x10, 0x00, 0x02, 0x00, 0x02, 0x04, 0x00, 0x07, 0x00, 0x09,
        ]);
        assert_eq!(master.link.tx, expected_request);
    }

    #[test]
    fn exception_reply_is_surfaced() {
        let confirmation = framed(&[0x01, 0x83, 0x02]);
        let mut master = master(&confirmation);

        let mut out = [0u16; 1];
        let err = master
            .read_holding_registers(station(1), 0, &mut out)
            .unwrap_err();
        match err {
            MasterError::Exception(ex) => {
                assert_eq!(ex.function_code, 0x03);
                assert_eq!(ex.exception_code, ExceptionCode::IllegalDataAddress);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn silent_station_times_out() {
        let mut master = master(&[]);

        let mut out = [0u16; 1];
        let err = master
            .read_holding_registers(station(1), 0, &mut out)
            .unwrap_err();
        assert_eq!(err, MasterError::Frame(FrameError::Timeout));
    }

    #[test]
    fn broadcast_write_expects_no_confirmation() {
        let mut master = master(&[]);

        master
            .write_multiple_registers(StationId::BROADCAST, 0, &[1, 2])
            .unwrap();

        let expected_request = framed(&[
            0x00, 0x10, 0x00, 0x00, 0x00, 0x02, 0x04, 0x00, 0x01, 0x00, 0x02,
        ]);
        assert_eq!(master.link.tx, expected_request);
    }

    #[test]
    fn broadcast_read_is_rejected_locally() {
        let mut master = master(&[]);

        let mut out = [0u16; 1];
        let err = master
            .read_holding_registers(StationId::BROADCAST, 0, &mut out)
            .unwrap_err();
        assert_eq!(
            err,
            MasterError::InvalidRequest("cannot read via broadcast")
        );
        assert!(master.link.tx.is_empty());
    }

    #[test]
    fn confirmation_from_wrong_station_is_rejected() {
        let confirmation = framed(&[0x02, 0x03, 0x02, 0x00, 0x2A]);
        let mut master = master(&confirmation);

        let mut out = [0u16; 1];
        let err = master
            .read_holding_registers(station(1), 0, &mut out)
            .unwrap_err();
        assert_eq!(
            err,
            MasterError::UnexpectedStation {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn register_count_mismatch_is_rejected() {
        let confirmation = framed(&[0x01, 0x03, 0x02, 0x00, 0x2A]);
        let mut master = master(&confirmation);

        let mut out = [0u16; 2];
        let err = master
            .read_holding_registers(station(1), 0, &mut out)
            .unwrap_err();
        assert_eq!(
            err,
            MasterError::InvalidResponse("register count mismatch")
        );
    }

    #[test]
    fn write_echo_mismatch_is_rejected() {
        let confirmation = framed(&[0x01, 0x10, 0x00, 0x05, 0x00, 0x02]);
        let mut master = master(&confirmation);

        let err = master
            .write_multiple_registers(station(1), 0x0002, &[7, 9])
            .unwrap_err();
        assert_eq!(
            err,
            MasterError::InvalidResponse("write acknowledgement echo mismatch")
        );
    }
}
