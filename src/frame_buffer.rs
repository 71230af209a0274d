use crate::errors::*;
use crate::proto::codec;
use crate::proto::Frame;
use bytes::BytesMut;
use log::trace;
use snafu::ResultExt;
use std::io;

const READ_CHUNK: usize = 16 * 1024;

/// Buffers inbound socket data and parses complete frames out of it.
pub(crate) struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub(crate) fn new() -> FrameBuffer {
        FrameBuffer {
            buf: BytesMut::new(),
        }
    }

    /// Reads from `stream` until at least one complete frame is available,
    /// then parses all buffered frames and feeds them to `handler`. Returns
    /// the number of bytes read; returns early with the byte count if the
    /// stream reports `WouldBlock`/`TimedOut` (the reader uses socket read
    /// timeouts to schedule heartbeats).
    pub(crate) fn read_from<S, F>(&mut self, stream: &mut S, mut handler: F) -> Result<usize>
    where
        S: io::Read,
        F: FnMut(Frame) -> Result<()>,
    {
        let mut bytes_read = 0;

        loop {
            let mut parsed_any = false;
            while let Some(frame_size) = codec::frame_size(&self.buf) {
                if self.buf.len() < frame_size {
                    break;
                }
                let frame_bytes = self.buf.split_to(frame_size);
                let frame = codec::parse_frame(&frame_bytes)?;
                trace!("read frame {:?}", frame);
                handler(frame)?;
                parsed_any = true;
            }
            if parsed_any {
                return Ok(bytes_read);
            }

            let mut chunk = [0u8; READ_CHUNK];
            match stream.read(&mut chunk) {
                Ok(0) => return UnexpectedSocketCloseSnafu.fail(),
                Ok(n) => {
                    trace!("read {} bytes", n);
                    self.buf.extend_from_slice(&chunk[..n]);
                    bytes_read += n;
                }
                Err(err) => match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                        return Ok(bytes_read)
                    }
                    io::ErrorKind::Interrupted => continue,
                    _ => return Err(err).context(IoErrorReadingSocketSnafu),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{codec, BasicAck, Method};
    use bytes::BytesMut;
    use mockstream::FailingMockStream;
    use std::io::{Cursor, Read};

    fn ack_frame(delivery_tag: u64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        codec::encode_method(
            &mut buf,
            1,
            &Method::BasicAck(BasicAck {
                delivery_tag,
                multiple: false,
            }),
        )
        .unwrap();
        buf.to_vec()
    }

    fn would_block() -> FailingMockStream {
        FailingMockStream::new(io::ErrorKind::WouldBlock, "", 1)
    }

    #[test]
    fn full_frame_available() {
        let frame = ack_frame(1);
        let mut stream = Cursor::new(frame.clone()).chain(would_block());

        let mut got = Vec::new();
        let mut buf = FrameBuffer::new();
        let n = buf.read_from(&mut stream, |f| Ok(got.push(f))).unwrap();

        assert_eq!(n, frame.len());
        assert_eq!(
            got,
            vec![Frame::Method(
                1,
                Method::BasicAck(BasicAck {
                    delivery_tag: 1,
                    multiple: false,
                })
            )]
        );
    }

    #[test]
    fn two_full_frames_parsed_in_one_call() {
        let mut bytes = ack_frame(1);
        bytes.extend_from_slice(&ack_frame(2));
        let mut stream = Cursor::new(bytes).chain(would_block());

        let mut tags = Vec::new();
        let mut buf = FrameBuffer::new();
        buf.read_from(&mut stream, |f| {
            if let Frame::Method(_, Method::BasicAck(ack)) = f {
                tags.push(ack.delivery_tag);
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(tags, vec![1, 2]);
    }

    #[test]
    fn partial_frame_held_until_rest_arrives() {
        let frame = ack_frame(7);
        let (head, tail) = frame.split_at(5);
        let mut stream = Cursor::new(head.to_vec())
            .chain(would_block())
            .chain(Cursor::new(tail.to_vec()))
            .chain(would_block());

        let mut got = Vec::new();
        let mut buf = FrameBuffer::new();
        let n = buf.read_from(&mut stream, |f| Ok(got.push(f))).unwrap();
        assert_eq!(n, 5);
        assert!(got.is_empty());

        buf.read_from(&mut stream, |f| Ok(got.push(f))).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn parse_failure_is_malformed() {
        let mut frame = ack_frame(1);
        let last = frame.len() - 1;
        frame[last] = 0x00; // clobber the frame-end octet
        let mut stream = Cursor::new(frame).chain(would_block());

        let mut buf = FrameBuffer::new();
        let res = buf.read_from(&mut stream, |_| panic!("should not be called"));
        assert!(matches!(res, Err(Error::ReceivedMalformed)));
    }

    #[test]
    fn handler_error_propagates() {
        let mut stream = Cursor::new(ack_frame(1)).chain(would_block());

        let mut buf = FrameBuffer::new();
        let res = buf.read_from(&mut stream, |_| ClientExceptionSnafu.fail());
        assert!(matches!(res, Err(Error::ClientException)));
    }

    #[test]
    fn eof_mid_frame_fails() {
        let frame = ack_frame(1);
        let mut stream = Cursor::new(frame[..4].to_vec());

        let mut buf = FrameBuffer::new();
        let res = buf.read_from(&mut stream, |_| panic!("should not be called"));
        assert!(matches!(res, Err(Error::UnexpectedSocketClose)));
    }

    #[test]
    fn io_error_propagates() {
        let mut stream = FailingMockStream::new(io::ErrorKind::ConnectionReset, "reset", 1);

        let mut buf = FrameBuffer::new();
        let res = buf.read_from(&mut stream, |_| panic!("should not be called"));
        assert!(matches!(res, Err(Error::IoErrorReadingSocket { .. })));
    }
}
