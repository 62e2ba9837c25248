//! The serving side: poll the line, dispatch one request, reply.

use core::time::Duration;

use crate::encoding::{Reader, Writer};
use crate::frame::reader::DEFAULT_INTER_BYTE_TIMEOUT;
use crate::frame::{
    send_frame, FrameError, FrameReader, RecvMode, CRC_LEN, MAX_FRAME_LEN, MIN_FRAME_LEN,
};
use crate::pdu::{DecodedRequest, ExceptionCode, ExceptionResponse, FunctionCode};
use crate::registers::{RegisterTable, StationId};
use crate::transport::{ByteSink, ByteSource, Clock, TxControl};
use crate::{DecodeError, EncodeError};

#[derive(Debug, Clone, Copy)]
pub struct SlaveConfig {
    pub station: StationId,
    pub inter_byte_timeout: Duration,
    pub max_frame_len: usize,
}

impl SlaveConfig {
    pub fn new(station: StationId) -> Self {
        Self {
            station,
            inter_byte_timeout: DEFAULT_INTER_BYTE_TIMEOUT,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    pub fn with_inter_byte_timeout(mut self, timeout: Duration) -> Self {
        self.inter_byte_timeout = timeout;
        self
    }

    /// Cap the accepted frame size. Values above the engine's own buffer
    /// size are clamped at poll time.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

/// What one poll cycle amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// A request was dispatched: a reply went out, or a broadcast write was
    /// applied silently.
    Served,
    /// A frame for another station went by.
    NotAddressed,
    /// The line was idle.
    NoData,
    /// A frame was started but timed out, overran the buffer or failed the
    /// checksum. Nothing was sent; the peer sees only silence.
    ProtocolError,
}

/// A polled RTU server bound to one station address.
pub struct Slave<L, C, X = ()> {
    link: L,
    clock: C,
    tx: X,
    config: SlaveConfig,
}

impl<L, C> Slave<L, C>
where
    L: ByteSource + ByteSink,
    C: Clock,
{
    pub fn new(link: L, clock: C, config: SlaveConfig) -> Self {
        Self::with_tx_control(link, clock, (), config)
    }
}

impl<L, C, X> Slave<L, C, X>
where
    L: ByteSource + ByteSink,
    C: Clock,
    X: TxControl,
{
    pub fn with_tx_control(link: L, clock: C, tx: X, config: SlaveConfig) -> Self {
        Self {
            link,
            clock,
            tx,
            config,
        }
    }

    pub const fn config(&self) -> &SlaveConfig {
        &self.config
    }

    /// Serve at most one request. Never blocks beyond the inter-byte
    /// timeout once a frame has started; returns immediately on an idle
    /// line.
    pub fn poll(&mut self, table: &mut RegisterTable<'_>) -> Outcome {
        if !self.link.available() {
            return Outcome::NoData;
        }

        let mut request = [0u8; MAX_FRAME_LEN];
        let max = self.config.max_frame_len.min(MAX_FRAME_LEN);
        let reader = FrameReader::new(RecvMode::Indication {
            station: self.config.station,
        })
        .with_inter_byte_timeout(self.config.inter_byte_timeout);

        let frame = match reader.read(&mut self.link, &mut self.clock, &mut request[..max]) {
            Ok(frame) => frame,
            Err(FrameError::NotAddressed) => return Outcome::NotAddressed,
            // Timeouts, overruns and corrupt frames are dropped without a
            // reply; the peer only ever sees a response timeout.
            Err(_) => return Outcome::ProtocolError,
        };

        let mut response = [0u8; MAX_FRAME_LEN];
        match dispatch(frame, table, self.config.station, &mut response) {
            Ok(Some(mut adu)) => {
                if send_frame(&mut self.link, &mut self.tx, &mut adu).is_err() {
                    return Outcome::ProtocolError;
                }
                Outcome::Served
            }
            Ok(None) => Outcome::Served,
            Err(_) => Outcome::ProtocolError,
        }
    }
}

/// Interpret a validated request frame against `table` and build the reply
/// ADU (checksum trailer not yet appended) into `rsp`.
///
/// Returns `None` when nothing must be sent: frames for other stations,
/// broadcast requests (which are executed silently), and broadcast errors,
/// which are never answered.
pub fn dispatch<'b>(
    frame: &[u8],
    table: &mut RegisterTable<'_>,
    station: StationId,
    rsp: &'b mut [u8],
) -> Result<Option<Writer<'b>>, EncodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Ok(None);
    }

    let address = frame[0];
    if !station.accepts(address) {
        return Ok(None);
    }
    let broadcast = address == 0;
    let pdu = &frame[1..frame.len() - CRC_LEN];

    let mut r = Reader::new(pdu);
    let decoded = match DecodedRequest::decode(&mut r) {
        Ok(req) if r.is_empty() => req,
        Ok(_) => {
            return exception(rsp, broadcast, address, pdu[0], ExceptionCode::IllegalDataValue)
        }
        Err(err) => {
            let function = pdu.first().copied().unwrap_or(0);
            return exception(rsp, broadcast, address, function, exception_for(err));
        }
    };

    match decoded {
        DecodedRequest::ReadHoldingRegisters(req) => {
            // A broadcast read has no reply channel; drop it.
            if broadcast {
                return Ok(None);
            }
            let Some(range) = table.checked_range(req.start_address, req.quantity) else {
                return exception(
                    rsp,
                    broadcast,
                    address,
                    pdu[0],
                    ExceptionCode::IllegalDataAddress,
                );
            };

            let byte_count: u8 = (range.len() * 2)
                .try_into()
                .map_err(|_| EncodeError::ValueOutOfRange)?;
            let mut w = Writer::new(rsp);
            w.write_u8(address)?;
            w.write_u8(FunctionCode::ReadHoldingRegisters.as_u8())?;
            w.write_u8(byte_count)?;
            for value in table.slice(range) {
                w.write_be_u16(*value)?;
            }
            Ok(Some(w))
        }
        DecodedRequest::WriteMultipleRegisters(req) => {
            let quantity = req.quantity() as u16;
            let Some(range) = table.checked_range(req.start_address, quantity) else {
                return exception(
                    rsp,
                    broadcast,
                    address,
                    pdu[0],
                    ExceptionCode::IllegalDataAddress,
                );
            };

            let slots = table.slice_mut(range);
            for (slot, bytes) in slots.iter_mut().zip(req.values_bytes.chunks_exact(2)) {
                *slot = u16::from_be_bytes([bytes[0], bytes[1]]);
            }

            if broadcast {
                return Ok(None);
            }
            let mut w = Writer::new(rsp);
            w.write_u8(address)?;
            w.write_u8(FunctionCode::WriteMultipleRegisters.as_u8())?;
            // Acknowledge by echoing the request's address and count bytes.
            w.write_all(&pdu[1..5])?;
            Ok(Some(w))
        }
    }
}

fn exception<'b>(
    rsp: &'b mut [u8],
    broadcast: bool,
    address: u8,
    function: u8,
    code: ExceptionCode,
) -> Result<Option<Writer<'b>>, EncodeError> {
    if broadcast {
        return Ok(None);
    }
    let mut w = Writer::new(rsp);
    w.write_u8(address)?;
    ExceptionResponse {
        function_code: function,
        exception_code: code,
    }
    .encode(&mut w)?;
    Ok(Some(w))
}

fn exception_for(err: DecodeError) -> ExceptionCode {
    match err {
        DecodeError::InvalidFunctionCode => ExceptionCode::IllegalFunction,
        DecodeError::UnexpectedEof | DecodeError::InvalidLength | DecodeError::InvalidValue => {
            ExceptionCode::IllegalDataValue
        }
    }
}
