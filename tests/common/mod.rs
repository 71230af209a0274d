//! A scripted in-process AMQP broker for integration tests.
//!
//! Each test spawns a thread that plays the server side of the conversation
//! over a loopback TCP socket, using the crate's own wire codec. Scripts read
//! the client's frames, assert on them, and reply; a script panic fails the
//! test when the broker thread is joined.

use bytes::BytesMut;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use warren::proto::{self, codec, ConnectionTune, ContentHeader, Frame, Method};
use warren::{AmqpProperties, Auth, Connection, ConnectionOptions};

pub struct BrokerConn {
    stream: TcpStream,
}

#[allow(dead_code)]
impl BrokerConn {
    pub fn read_frame(&mut self) -> Frame {
        codec::read_frame(&mut self.stream).expect("broker failed to read frame")
    }

    pub fn send(&mut self, frame: Frame) {
        let mut buf = BytesMut::new();
        codec::encode_frame(&mut buf, &frame).expect("broker failed to encode frame");
        self.stream.write_all(&buf).expect("broker failed to write");
    }

    pub fn send_method(&mut self, channel_id: u16, method: Method) {
        self.send(Frame::Method(channel_id, method));
    }

    /// Sends a content-bearing method followed by its header and body frames,
    /// chunked to `frame_max`.
    pub fn send_content(
        &mut self,
        channel_id: u16,
        method: Method,
        properties: &AmqpProperties,
        body: &[u8],
        frame_max: u32,
    ) {
        self.send_method(channel_id, method);
        let mut buf = BytesMut::new();
        codec::encode_header(
            &mut buf,
            channel_id,
            proto::CLASS_BASIC,
            body.len() as u64,
            properties,
        )
        .unwrap();
        for chunk in body.chunks(frame_max as usize - 8) {
            codec::encode_body(&mut buf, channel_id, chunk);
        }
        self.stream.write_all(&buf).unwrap();
    }

    pub fn expect_method(&mut self) -> (u16, Method) {
        loop {
            match self.read_frame() {
                Frame::Method(channel_id, method) => return (channel_id, method),
                Frame::Heartbeat(_) => continue,
                frame => panic!("broker expected method frame, got {:?}", frame),
            }
        }
    }

    /// Reads a content-bearing method's header and body frames, returning the
    /// reassembled body and the sizes of the individual body frames.
    pub fn read_content(&mut self, channel_id: u16) -> (ContentHeader, Vec<u8>, Vec<usize>) {
        let header = match self.read_frame() {
            Frame::Header(ch, header) => {
                assert_eq!(ch, channel_id, "content header on wrong channel");
                header
            }
            frame => panic!("broker expected content header, got {:?}", frame),
        };
        let mut body = Vec::new();
        let mut frame_sizes = Vec::new();
        while (body.len() as u64) < header.body_size {
            match self.read_frame() {
                Frame::Body(ch, chunk) => {
                    assert_eq!(ch, channel_id, "content body on wrong channel");
                    frame_sizes.push(chunk.len());
                    body.extend_from_slice(&chunk);
                }
                frame => panic!("broker expected content body, got {:?}", frame),
            }
        }
        (header, body, frame_sizes)
    }

    pub fn handshake(&mut self) {
        self.handshake_with(2047, 131_072, 0);
    }

    pub fn handshake_with(&mut self, channel_max: u16, frame_max: u32, heartbeat: u16) {
        let mut header = [0u8; 8];
        self.stream.read_exact(&mut header).unwrap();
        assert_eq!(&header[..], proto::PROTOCOL_HEADER);

        self.send_method(
            0,
            Method::ConnectionStart(proto::ConnectionStart {
                version_major: 0,
                version_minor: 9,
                server_properties: warren::FieldTable::new(),
                mechanisms: "PLAIN AMQPLAIN EXTERNAL".to_string(),
                locales: "en_US".to_string(),
            }),
        );
        match self.expect_method() {
            (0, Method::ConnectionStartOk(start_ok)) => {
                assert_eq!(start_ok.locale, "en_US");
            }
            other => panic!("broker expected connection.start-ok, got {:?}", other),
        }

        self.send_method(
            0,
            Method::ConnectionTune(ConnectionTune {
                channel_max,
                frame_max,
                heartbeat,
            }),
        );
        match self.expect_method() {
            (0, Method::ConnectionTuneOk(_)) => (),
            other => panic!("broker expected connection.tune-ok, got {:?}", other),
        }
        match self.expect_method() {
            (0, Method::ConnectionOpen(open)) => {
                assert_eq!(open.virtual_host, "/");
            }
            other => panic!("broker expected connection.open, got {:?}", other),
        }
        self.send_method(0, Method::ConnectionOpenOk);
    }

    /// Expects channel.open on any channel and confirms it, returning the id.
    pub fn expect_channel_open(&mut self) -> u16 {
        match self.expect_method() {
            (channel_id, Method::ChannelOpen) => {
                self.send_method(channel_id, Method::ChannelOpenOk);
                channel_id
            }
            other => panic!("broker expected channel.open, got {:?}", other),
        }
    }

    /// Expects channel.close and confirms it.
    pub fn expect_channel_close(&mut self, channel_id: u16) {
        match self.expect_method() {
            (ch, Method::ChannelClose(_)) => {
                assert_eq!(ch, channel_id);
                self.send_method(channel_id, Method::ChannelCloseOk);
            }
            other => panic!("broker expected channel.close, got {:?}", other),
        }
    }

    /// Expects connection.close and confirms it.
    pub fn expect_close(&mut self) {
        match self.expect_method() {
            (0, Method::ConnectionClose(_)) => {
                self.send_method(0, Method::ConnectionCloseOk);
            }
            other => panic!("broker expected connection.close, got {:?}", other),
        }
    }

    /// Reads frames until the client hangs up. Used by scripts that end the
    /// conversation from the server side.
    pub fn drain_until_eof(&mut self) {
        let mut buf = [0u8; 4096];
        while let Ok(n) = self.stream.read(&mut buf) {
            if n == 0 {
                break;
            }
        }
    }
}

/// Starts a scripted broker and opens a client connection to it.
pub fn start<F>(script: F) -> (Connection, JoinHandle<()>)
where
    F: FnOnce(BrokerConn) + Send + 'static,
{
    start_with_options(ConnectionOptions::default(), script)
}

pub fn start_with_options<F>(
    options: ConnectionOptions<Auth>,
    script: F,
) -> (Connection, JoinHandle<()>)
where
    F: FnOnce(BrokerConn) + Send + 'static,
{
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let broker = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        script(BrokerConn { stream });
    });
    let stream = TcpStream::connect(addr).unwrap();
    let connection = Connection::open_stream(stream, options).unwrap();
    (connection, broker)
}
