use crate::encoding::{Reader, Writer};
use crate::pdu::request::{MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};
use crate::pdu::{ExceptionResponse, FunctionCode};
use crate::{DecodeError, EncodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadHoldingRegistersResponse<'a> {
    /// Register values, two big-endian bytes each, ascending address order.
    pub data: &'a [u8],
}

impl<'a> ReadHoldingRegistersResponse<'a> {
    fn decode_body(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let byte_count = usize::from(r.read_u8()?);
        if byte_count == 0 || (byte_count % 2) != 0 {
            return Err(DecodeError::InvalidLength);
        }
        if byte_count > usize::from(MAX_READ_REGISTERS) * 2 {
            return Err(DecodeError::InvalidLength);
        }
        let data = r.read_exact(byte_count)?;
        Ok(Self { data })
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if (self.data.len() % 2) != 0 {
            return Err(EncodeError::InvalidLength);
        }
        let byte_count: u8 = self
            .data
            .len()
            .try_into()
            .map_err(|_| EncodeError::ValueOutOfRange)?;
        w.write_u8(FunctionCode::ReadHoldingRegisters.as_u8())?;
        w.write_u8(byte_count)?;
        w.write_all(self.data)?;
        Ok(())
    }

    pub fn register_count(&self) -> usize {
        self.data.len() / 2
    }

    pub fn register(&self, index: usize) -> Option<u16> {
        let offset = index.checked_mul(2)?;
        let bytes = self.data.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMultipleRegistersResponse {
    pub start_address: u16,
    pub quantity: u16,
}

impl WriteMultipleRegistersResponse {
    fn decode_body(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let start_address = r.read_be_u16()?;
        let quantity = r.read_be_u16()?;
        if quantity == 0 || quantity > MAX_WRITE_REGISTERS {
            return Err(DecodeError::InvalidValue);
        }
        Ok(Self {
            start_address,
            quantity,
        })
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.quantity == 0 || self.quantity > MAX_WRITE_REGISTERS {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_u8(FunctionCode::WriteMultipleRegisters.as_u8())?;
        w.write_be_u16(self.start_address)?;
        w.write_be_u16(self.quantity)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    ReadHoldingRegisters(ReadHoldingRegistersResponse<'a>),
    WriteMultipleRegisters(WriteMultipleRegistersResponse),
    Exception(ExceptionResponse),
}

impl<'a> Response<'a> {
    pub fn decode(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let function_byte = r.read_u8()?;
        if FunctionCode::is_exception(function_byte) {
            return Ok(Self::Exception(ExceptionResponse::decode(
                function_byte,
                r,
            )?));
        }

        match FunctionCode::from_u8(function_byte)? {
            FunctionCode::ReadHoldingRegisters => Ok(Self::ReadHoldingRegisters(
                ReadHoldingRegistersResponse::decode_body(r)?,
            )),
            FunctionCode::WriteMultipleRegisters => Ok(Self::WriteMultipleRegisters(
                WriteMultipleRegistersResponse::decode_body(r)?,
            )),
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::ReadHoldingRegisters(resp) => resp.encode(w),
            Self::WriteMultipleRegisters(resp) => resp.encode(w),
            Self::Exception(resp) => resp.encode(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadHoldingRegistersResponse, Response, WriteMultipleRegistersResponse};
    use crate::encoding::{Reader, Writer};
    use crate::pdu::ExceptionCode;
    use crate::DecodeError;

    #[test]
    fn register_helpers_work() {
        let resp = ReadHoldingRegistersResponse {
            data: &[0x12, 0x34, 0xAB, 0xCD],
        };
        assert_eq!(resp.register_count(), 2);
        assert_eq!(resp.register(0), Some(0x1234));
        assert_eq!(resp.register(1), Some(0xABCD));
        assert_eq!(resp.register(2), None);
    }

    #[test]
    fn read_response_roundtrip() {
        let original = Response::ReadHoldingRegisters(ReadHoldingRegistersResponse {
            data: &[0x00, 0x14, 0x00, 0x1E],
        });
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        original.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x03, 0x04, 0x00, 0x14, 0x00, 0x1E]);

        let mut r = Reader::new(w.as_written());
        assert_eq!(Response::decode(&mut r).unwrap(), original);
    }

    #[test]
    fn write_response_roundtrip() {
        let original = Response::WriteMultipleRegisters(WriteMultipleRegistersResponse {
            start_address: 0x0001,
            quantity: 2,
        });
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        original.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x10, 0x00, 0x01, 0x00, 0x02]);

        let mut r = Reader::new(w.as_written());
        assert_eq!(Response::decode(&mut r).unwrap(), original);
    }

    #[test]
    fn decodes_exception_with_unknown_code() {
        let mut r = Reader::new(&[0x83, 0x19]);
        match Response::decode(&mut r).unwrap() {
            Response::Exception(ex) => {
                assert_eq!(ex.function_code, 0x03);
                assert_eq!(ex.exception_code, ExceptionCode::Unknown(0x19));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn rejects_odd_byte_count() {
        let mut r = Reader::new(&[0x03, 0x03, 0x00, 0x14, 0x00]);
        assert_eq!(
            Response::decode(&mut r).unwrap_err(),
            DecodeError::InvalidLength
        );
    }

    #[test]
    fn rejects_unknown_function() {
        let mut r = Reader::new(&[0x07, 0x00]);
        assert_eq!(
            Response::decode(&mut r).unwrap_err(),
            DecodeError::InvalidFunctionCode
        );
    }
}
