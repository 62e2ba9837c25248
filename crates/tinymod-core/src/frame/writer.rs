//! Frame finalization: checksum trailer and handoff to the transport.

use crate::encoding::Writer;
use crate::frame::crc;
use crate::transport::{ByteSink, TxControl};
use crate::EncodeError;

/// Append the checksum trailer to the ADU accumulated in `adu` and hand
/// the finished frame to `sink`, bracketed by the direction-control hooks.
pub fn send_frame<S, X>(sink: &mut S, tx: &mut X, adu: &mut Writer<'_>) -> Result<(), EncodeError>
where
    S: ByteSink + ?Sized,
    X: TxControl + ?Sized,
{
    let crc = crc::crc16(adu.as_written());
    adu.write_all(&crc::trailer(crc))?;

    tx.before_transmit();
    sink.write(adu.as_written());
    tx.after_transmit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::send_frame;
    use crate::encoding::Writer;
    use crate::frame::crc;
    use crate::transport::{ByteSink, TxControl};

    #[derive(Default)]
    struct CaptureSink {
        sent: Vec<u8>,
    }

    impl ByteSink for CaptureSink {
        fn write(&mut self, bytes: &[u8]) {
            self.sent.extend_from_slice(bytes);
        }
    }

    #[derive(Default)]
    struct HookLog {
        events: Vec<&'static str>,
    }

    impl TxControl for HookLog {
        fn before_transmit(&mut self) {
            self.events.push("before");
        }

        fn after_transmit(&mut self) {
            self.events.push("after");
        }
    }

    #[test]
    fn appends_trailer_and_sends() {
        let mut sink = CaptureSink::default();
        let mut buf = [0u8; 16];
        let mut adu = Writer::new(&mut buf);
        adu.write_all(&[0x01, 0x03, 0x02, 0x00, 0x2A]).unwrap();

        send_frame(&mut sink, &mut (), &mut adu).unwrap();

        assert_eq!(sink.sent.len(), 7);
        assert_eq!(&sink.sent[..5], &[0x01, 0x03, 0x02, 0x00, 0x2A]);
        assert!(crc::check(&sink.sent));
    }

    #[test]
    fn brackets_transmission_with_hooks() {
        let mut sink = CaptureSink::default();
        let mut hooks = HookLog::default();
        let mut buf = [0u8; 8];
        let mut adu = Writer::new(&mut buf);
        adu.write_all(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]).unwrap();

        send_frame(&mut sink, &mut hooks, &mut adu).unwrap();
        assert_eq!(hooks.events, ["before", "after"]);
    }
}
