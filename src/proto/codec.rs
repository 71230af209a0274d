//! Frame encoders and decoders.
//!
//! Encoders append complete wire frames (header, payload, frame-end octet) to
//! a `BytesMut`. Decoders consume a byte slice holding exactly one frame and
//! yield a typed [`Frame`]; every read is bounds-checked and any truncation,
//! unknown discriminant, or missing terminator fails with
//! `Error::ReceivedMalformed`.

use super::field_table::{self, FieldTable};
use super::properties::AmqpProperties;
use super::*;
use crate::errors::*;
use bytes::{BufMut, BytesMut};
use std::io::{self, Read};

/// A bounds-checked cursor over a frame payload.
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
}

macro_rules! decode_int {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self) -> Result<$ty> {
            let bytes = self.take(std::mem::size_of::<$ty>())?;
            Ok(<$ty>::from_be_bytes(bytes.try_into().unwrap()))
        }
    };
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Decoder<'a> {
        Decoder { buf }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return ReceivedMalformedSnafu.fail();
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    decode_int!(u8, u8);
    decode_int!(u16, u16);
    decode_int!(u32, u32);
    decode_int!(u64, u64);
    decode_int!(i8, i8);
    decode_int!(i16, i16);
    decode_int!(i32, i32);
    decode_int!(i64, i64);

    pub(crate) fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    pub(crate) fn short_string(&mut self) -> Result<String> {
        let len = self.u8()? as usize;
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    pub(crate) fn long_string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    pub(crate) fn table(&mut self) -> Result<FieldTable> {
        field_table::decode_table(self)
    }
}

/// Serializes a method frame.
pub fn encode_method(buf: &mut BytesMut, channel_id: ChannelId, method: &Method) -> Result<()> {
    let mut payload = BytesMut::with_capacity(64);
    payload.put_u32(method.class_method());
    encode_method_args(&mut payload, method)?;
    put_frame(buf, FRAME_TYPE_METHOD, channel_id, &payload);
    Ok(())
}

/// Serializes a content header frame.
pub fn encode_header(
    buf: &mut BytesMut,
    channel_id: ChannelId,
    class_id: u16,
    body_size: u64,
    properties: &AmqpProperties,
) -> Result<()> {
    let mut payload = BytesMut::with_capacity(64);
    payload.put_u16(class_id);
    payload.put_u16(0); // weight, reserved
    payload.put_u64(body_size);
    properties.encode(&mut payload)?;
    put_frame(buf, FRAME_TYPE_HEADER, channel_id, &payload);
    Ok(())
}

/// Serializes a content body frame. The caller is responsible for chunking
/// `content` to the negotiated frame size.
pub fn encode_body(buf: &mut BytesMut, channel_id: ChannelId, content: &[u8]) {
    put_frame(buf, FRAME_TYPE_BODY, channel_id, content);
}

/// Serializes an empty heartbeat frame.
pub fn encode_heartbeat(buf: &mut BytesMut, channel_id: ChannelId) {
    put_frame(buf, FRAME_TYPE_HEARTBEAT, channel_id, &[]);
}

/// Serializes any [`Frame`].
pub fn encode_frame(buf: &mut BytesMut, frame: &Frame) -> Result<()> {
    match frame {
        Frame::Method(channel_id, method) => encode_method(buf, *channel_id, method),
        Frame::Header(channel_id, header) => encode_header(
            buf,
            *channel_id,
            header.class_id,
            header.body_size,
            &header.properties,
        ),
        Frame::Body(channel_id, content) => {
            encode_body(buf, *channel_id, content);
            Ok(())
        }
        Frame::Heartbeat(channel_id) => {
            encode_heartbeat(buf, *channel_id);
            Ok(())
        }
    }
}

fn put_frame(buf: &mut BytesMut, frame_type: u8, channel_id: ChannelId, payload: &[u8]) {
    buf.reserve(payload.len() + FRAME_OVERHEAD);
    buf.put_u8(frame_type);
    buf.put_u16(channel_id);
    buf.put_u32(payload.len() as u32);
    buf.put(payload);
    buf.put_u8(FRAME_END);
}

/// Returns the total size in bytes of the next frame, or `None` if fewer than
/// 7 bytes are available.
pub fn frame_size(buf: &[u8]) -> Option<usize> {
    if buf.len() < 7 {
        return None;
    }
    let payload_len = u32::from_be_bytes(buf[3..7].try_into().unwrap()) as usize;
    Some(payload_len + FRAME_OVERHEAD)
}

/// Parses exactly one complete frame (as sized by [`frame_size`]) out of
/// `buf`, verifying the frame-end octet.
pub fn parse_frame(buf: &[u8]) -> Result<Frame> {
    let mut d = Decoder::new(buf);
    let frame_type = d.u8()?;
    let channel_id = d.u16()?;
    let len = d.u32()? as usize;
    let payload = d.take(len)?;
    if d.u8()? != FRAME_END || !d.is_empty() {
        return ReceivedMalformedSnafu.fail();
    }

    let mut d = Decoder::new(payload);
    let frame = match frame_type {
        FRAME_TYPE_METHOD => Frame::Method(channel_id, decode_method(&mut d)?),
        FRAME_TYPE_HEADER => {
            let class_id = d.u16()?;
            let _weight = d.u16()?;
            let body_size = d.u64()?;
            let properties = AmqpProperties::decode(&mut d)?;
            Frame::Header(
                channel_id,
                ContentHeader {
                    class_id,
                    body_size,
                    properties,
                },
            )
        }
        FRAME_TYPE_BODY => return Ok(Frame::Body(channel_id, payload.to_vec())),
        FRAME_TYPE_HEARTBEAT => Frame::Heartbeat(channel_id),
        _ => return ReceivedMalformedSnafu.fail(),
    };
    if !d.is_empty() {
        return ReceivedMalformedSnafu.fail();
    }
    Ok(frame)
}

/// Reads exactly one frame from a blocking reader. Used during the connection
/// handshake, before the reader thread takes ownership of the socket.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Frame> {
    fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
        r.read_exact(buf).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedSocketClose,
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::ConnectionTimeout,
            _ => Error::IoErrorReadingSocket {
                source: std::sync::Arc::new(err),
            },
        })
    }

    let mut header = [0u8; 7];
    read_exact(r, &mut header)?;
    let payload_len = u32::from_be_bytes(header[3..7].try_into().unwrap()) as usize;
    let mut rest = vec![0u8; payload_len + 1];
    read_exact(r, &mut rest)?;
    let mut whole = Vec::with_capacity(7 + rest.len());
    whole.extend_from_slice(&header);
    whole.extend_from_slice(&rest);
    parse_frame(&whole)
}

fn put_bits(buf: &mut BytesMut, bits: &[bool]) {
    let mut byte = 0u8;
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            byte |= 1 << i;
        }
    }
    buf.put_u8(byte);
}

fn encode_method_args(buf: &mut BytesMut, method: &Method) -> Result<()> {
    match method {
        Method::ConnectionStart(m) => {
            buf.put_u8(m.version_major);
            buf.put_u8(m.version_minor);
            field_table::encode_table(buf, &m.server_properties)?;
            field_table::encode_long_string(buf, &m.mechanisms);
            field_table::encode_long_string(buf, &m.locales);
        }
        Method::ConnectionStartOk(m) => {
            field_table::encode_table(buf, &m.client_properties)?;
            field_table::encode_short_string(buf, &m.mechanism)?;
            field_table::encode_long_string(buf, &m.response);
            field_table::encode_short_string(buf, &m.locale)?;
        }
        Method::ConnectionSecure(m) => {
            field_table::encode_long_string(buf, &m.challenge);
        }
        Method::ConnectionSecureOk(m) => {
            field_table::encode_long_string(buf, &m.response);
        }
        Method::ConnectionTune(m) => {
            buf.put_u16(m.channel_max);
            buf.put_u32(m.frame_max);
            buf.put_u16(m.heartbeat);
        }
        Method::ConnectionTuneOk(m) => {
            buf.put_u16(m.channel_max);
            buf.put_u32(m.frame_max);
            buf.put_u16(m.heartbeat);
        }
        Method::ConnectionOpen(m) => {
            field_table::encode_short_string(buf, &m.virtual_host)?;
            buf.put_u8(0); // reserved capabilities
            buf.put_u8(0); // reserved insist
        }
        Method::ConnectionOpenOk => buf.put_u8(0), // reserved known-hosts
        Method::ConnectionClose(m) => {
            buf.put_u16(m.reply_code);
            field_table::encode_short_string(buf, &m.reply_text)?;
            buf.put_u16(m.class_id);
            buf.put_u16(m.method_id);
        }
        Method::ConnectionCloseOk => (),
        Method::ConnectionBlocked(m) => {
            field_table::encode_short_string(buf, &m.reason)?;
        }
        Method::ConnectionUnblocked => (),
        Method::ChannelOpen => buf.put_u8(0), // reserved out-of-band
        Method::ChannelOpenOk => buf.put_u32(0), // reserved channel-id
        Method::ChannelClose(m) => {
            buf.put_u16(m.reply_code);
            field_table::encode_short_string(buf, &m.reply_text)?;
            buf.put_u16(m.class_id);
            buf.put_u16(m.method_id);
        }
        Method::ChannelCloseOk => (),
        Method::ExchangeDeclare(m) => {
            buf.put_u16(0); // reserved ticket
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.type_)?;
            put_bits(
                buf,
                &[m.passive, m.durable, m.auto_delete, m.internal, m.nowait],
            );
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::ExchangeDeclareOk => (),
        Method::ExchangeDelete(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.exchange)?;
            put_bits(buf, &[m.if_unused, m.nowait]);
        }
        Method::ExchangeDeleteOk => (),
        Method::ExchangeBind(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.destination)?;
            field_table::encode_short_string(buf, &m.source)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
            put_bits(buf, &[m.nowait]);
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::ExchangeBindOk => (),
        Method::ExchangeUnbind(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.destination)?;
            field_table::encode_short_string(buf, &m.source)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
            put_bits(buf, &[m.nowait]);
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::ExchangeUnbindOk => (),
        Method::QueueDeclare(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            put_bits(
                buf,
                &[m.passive, m.durable, m.exclusive, m.auto_delete, m.nowait],
            );
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::QueueDeclareOk(m) => {
            field_table::encode_short_string(buf, &m.queue)?;
            buf.put_u32(m.message_count);
            buf.put_u32(m.consumer_count);
        }
        Method::QueueBind(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
            put_bits(buf, &[m.nowait]);
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::QueueBindOk => (),
        Method::QueueUnbind(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::QueueUnbindOk => (),
        Method::QueuePurge(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            put_bits(buf, &[m.nowait]);
        }
        Method::QueuePurgeOk(m) => buf.put_u32(m.message_count),
        Method::QueueDelete(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            put_bits(buf, &[m.if_unused, m.if_empty, m.nowait]);
        }
        Method::QueueDeleteOk(m) => buf.put_u32(m.message_count),
        Method::BasicQos(m) => {
            buf.put_u32(m.prefetch_size);
            buf.put_u16(m.prefetch_count);
            put_bits(buf, &[m.global]);
        }
        Method::BasicQosOk => (),
        Method::BasicConsume(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            field_table::encode_short_string(buf, &m.consumer_tag)?;
            put_bits(buf, &[m.no_local, m.no_ack, m.exclusive, m.nowait]);
            field_table::encode_table(buf, &m.arguments)?;
        }
        Method::BasicConsumeOk(m) => {
            field_table::encode_short_string(buf, &m.consumer_tag)?;
        }
        Method::BasicCancel(m) => {
            field_table::encode_short_string(buf, &m.consumer_tag)?;
            put_bits(buf, &[m.nowait]);
        }
        Method::BasicCancelOk(m) => {
            field_table::encode_short_string(buf, &m.consumer_tag)?;
        }
        Method::BasicPublish(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
            put_bits(buf, &[m.mandatory, m.immediate]);
        }
        Method::BasicReturn(m) => {
            buf.put_u16(m.reply_code);
            field_table::encode_short_string(buf, &m.reply_text)?;
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
        }
        Method::BasicDeliver(m) => {
            field_table::encode_short_string(buf, &m.consumer_tag)?;
            buf.put_u64(m.delivery_tag);
            put_bits(buf, &[m.redelivered]);
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
        }
        Method::BasicGet(m) => {
            buf.put_u16(0);
            field_table::encode_short_string(buf, &m.queue)?;
            put_bits(buf, &[m.no_ack]);
        }
        Method::BasicGetOk(m) => {
            buf.put_u64(m.delivery_tag);
            put_bits(buf, &[m.redelivered]);
            field_table::encode_short_string(buf, &m.exchange)?;
            field_table::encode_short_string(buf, &m.routing_key)?;
            buf.put_u32(m.message_count);
        }
        Method::BasicGetEmpty => buf.put_u8(0), // reserved cluster-id
        Method::BasicAck(m) => {
            buf.put_u64(m.delivery_tag);
            put_bits(buf, &[m.multiple]);
        }
        Method::BasicNack(m) => {
            buf.put_u64(m.delivery_tag);
            put_bits(buf, &[m.multiple, m.requeue]);
        }
        Method::BasicReject(m) => {
            buf.put_u64(m.delivery_tag);
            put_bits(buf, &[m.requeue]);
        }
        Method::BasicRecover(m) => put_bits(buf, &[m.requeue]),
        Method::BasicRecoverOk => (),
        Method::ConfirmSelect(m) => put_bits(buf, &[m.nowait]),
        Method::ConfirmSelectOk => (),
        Method::TxSelect
        | Method::TxSelectOk
        | Method::TxCommit
        | Method::TxCommitOk
        | Method::TxRollback
        | Method::TxRollbackOk => (),
    }
    Ok(())
}

fn decode_method(d: &mut Decoder) -> Result<Method> {
    let class_method = d.u32()?;
    Ok(match class_method {
        CONNECTION_START => Method::ConnectionStart(ConnectionStart {
            version_major: d.u8()?,
            version_minor: d.u8()?,
            server_properties: d.table()?,
            mechanisms: d.long_string()?,
            locales: d.long_string()?,
        }),
        CONNECTION_START_OK => Method::ConnectionStartOk(ConnectionStartOk {
            client_properties: d.table()?,
            mechanism: d.short_string()?,
            response: d.long_string()?,
            locale: d.short_string()?,
        }),
        CONNECTION_SECURE => Method::ConnectionSecure(ConnectionSecure {
            challenge: d.long_string()?,
        }),
        CONNECTION_SECURE_OK => Method::ConnectionSecureOk(ConnectionSecureOk {
            response: d.long_string()?,
        }),
        CONNECTION_TUNE => Method::ConnectionTune(ConnectionTune {
            channel_max: d.u16()?,
            frame_max: d.u32()?,
            heartbeat: d.u16()?,
        }),
        CONNECTION_TUNE_OK => Method::ConnectionTuneOk(ConnectionTuneOk {
            channel_max: d.u16()?,
            frame_max: d.u32()?,
            heartbeat: d.u16()?,
        }),
        CONNECTION_OPEN => {
            let virtual_host = d.short_string()?;
            let _reserved = d.short_string()?;
            let _reserved = d.u8()?;
            Method::ConnectionOpen(ConnectionOpen { virtual_host })
        }
        CONNECTION_OPEN_OK => {
            let _reserved = d.short_string()?;
            Method::ConnectionOpenOk
        }
        CONNECTION_CLOSE => Method::ConnectionClose(ConnectionClose {
            reply_code: d.u16()?,
            reply_text: d.short_string()?,
            class_id: d.u16()?,
            method_id: d.u16()?,
        }),
        CONNECTION_CLOSE_OK => Method::ConnectionCloseOk,
        CONNECTION_BLOCKED => Method::ConnectionBlocked(ConnectionBlocked {
            reason: d.short_string()?,
        }),
        CONNECTION_UNBLOCKED => Method::ConnectionUnblocked,
        CHANNEL_OPEN => {
            let _reserved = d.short_string()?;
            Method::ChannelOpen
        }
        CHANNEL_OPEN_OK => {
            let _reserved = d.long_string()?;
            Method::ChannelOpenOk
        }
        CHANNEL_CLOSE => Method::ChannelClose(ChannelClose {
            reply_code: d.u16()?,
            reply_text: d.short_string()?,
            class_id: d.u16()?,
            method_id: d.u16()?,
        }),
        CHANNEL_CLOSE_OK => Method::ChannelCloseOk,
        EXCHANGE_DECLARE => {
            let _ticket = d.u16()?;
            let exchange = d.short_string()?;
            let type_ = d.short_string()?;
            let bits = d.u8()?;
            Method::ExchangeDeclare(ExchangeDeclare {
                exchange,
                type_,
                passive: bits & 1 != 0,
                durable: bits & (1 << 1) != 0,
                auto_delete: bits & (1 << 2) != 0,
                internal: bits & (1 << 3) != 0,
                nowait: bits & (1 << 4) != 0,
                arguments: d.table()?,
            })
        }
        EXCHANGE_DECLARE_OK => Method::ExchangeDeclareOk,
        EXCHANGE_DELETE => {
            let _ticket = d.u16()?;
            let exchange = d.short_string()?;
            let bits = d.u8()?;
            Method::ExchangeDelete(ExchangeDelete {
                exchange,
                if_unused: bits & 1 != 0,
                nowait: bits & (1 << 1) != 0,
            })
        }
        EXCHANGE_DELETE_OK => Method::ExchangeDeleteOk,
        EXCHANGE_BIND => {
            let _ticket = d.u16()?;
            let destination = d.short_string()?;
            let source = d.short_string()?;
            let routing_key = d.short_string()?;
            let bits = d.u8()?;
            Method::ExchangeBind(ExchangeBind {
                destination,
                source,
                routing_key,
                nowait: bits & 1 != 0,
                arguments: d.table()?,
            })
        }
        EXCHANGE_BIND_OK => Method::ExchangeBindOk,
        EXCHANGE_UNBIND => {
            let _ticket = d.u16()?;
            let destination = d.short_string()?;
            let source = d.short_string()?;
            let routing_key = d.short_string()?;
            let bits = d.u8()?;
            Method::ExchangeUnbind(ExchangeUnbind {
                destination,
                source,
                routing_key,
                nowait: bits & 1 != 0,
                arguments: d.table()?,
            })
        }
        EXCHANGE_UNBIND_OK => Method::ExchangeUnbindOk,
        QUEUE_DECLARE => {
            let _ticket = d.u16()?;
            let queue = d.short_string()?;
            let bits = d.u8()?;
            Method::QueueDeclare(QueueDeclare {
                queue,
                passive: bits & 1 != 0,
                durable: bits & (1 << 1) != 0,
                exclusive: bits & (1 << 2) != 0,
                auto_delete: bits & (1 << 3) != 0,
                nowait: bits & (1 << 4) != 0,
                arguments: d.table()?,
            })
        }
        QUEUE_DECLARE_OK => Method::QueueDeclareOk(QueueDeclareOk {
            queue: d.short_string()?,
            message_count: d.u32()?,
            consumer_count: d.u32()?,
        }),
        QUEUE_BIND => {
            let _ticket = d.u16()?;
            let queue = d.short_string()?;
            let exchange = d.short_string()?;
            let routing_key = d.short_string()?;
            let bits = d.u8()?;
            Method::QueueBind(QueueBind {
                queue,
                exchange,
                routing_key,
                nowait: bits & 1 != 0,
                arguments: d.table()?,
            })
        }
        QUEUE_BIND_OK => Method::QueueBindOk,
        QUEUE_UNBIND => {
            let _ticket = d.u16()?;
            Method::QueueUnbind(QueueUnbind {
                queue: d.short_string()?,
                exchange: d.short_string()?,
                routing_key: d.short_string()?,
                arguments: d.table()?,
            })
        }
        QUEUE_UNBIND_OK => Method::QueueUnbindOk,
        QUEUE_PURGE => {
            let _ticket = d.u16()?;
            Method::QueuePurge(QueuePurge {
                queue: d.short_string()?,
                nowait: d.u8()? & 1 != 0,
            })
        }
        QUEUE_PURGE_OK => Method::QueuePurgeOk(QueuePurgeOk {
            message_count: d.u32()?,
        }),
        QUEUE_DELETE => {
            let _ticket = d.u16()?;
            let queue = d.short_string()?;
            let bits = d.u8()?;
            Method::QueueDelete(QueueDelete {
                queue,
                if_unused: bits & 1 != 0,
                if_empty: bits & (1 << 1) != 0,
                nowait: bits & (1 << 2) != 0,
            })
        }
        QUEUE_DELETE_OK => Method::QueueDeleteOk(QueueDeleteOk {
            message_count: d.u32()?,
        }),
        BASIC_QOS => Method::BasicQos(BasicQos {
            prefetch_size: d.u32()?,
            prefetch_count: d.u16()?,
            global: d.u8()? & 1 != 0,
        }),
        BASIC_QOS_OK => Method::BasicQosOk,
        BASIC_CONSUME => {
            let _ticket = d.u16()?;
            let queue = d.short_string()?;
            let consumer_tag = d.short_string()?;
            let bits = d.u8()?;
            Method::BasicConsume(BasicConsume {
                queue,
                consumer_tag,
                no_local: bits & 1 != 0,
                no_ack: bits & (1 << 1) != 0,
                exclusive: bits & (1 << 2) != 0,
                nowait: bits & (1 << 3) != 0,
                arguments: d.table()?,
            })
        }
        BASIC_CONSUME_OK => Method::BasicConsumeOk(BasicConsumeOk {
            consumer_tag: d.short_string()?,
        }),
        BASIC_CANCEL => Method::BasicCancel(BasicCancel {
            consumer_tag: d.short_string()?,
            nowait: d.u8()? & 1 != 0,
        }),
        BASIC_CANCEL_OK => Method::BasicCancelOk(BasicCancelOk {
            consumer_tag: d.short_string()?,
        }),
        BASIC_PUBLISH => {
            let _ticket = d.u16()?;
            let exchange = d.short_string()?;
            let routing_key = d.short_string()?;
            let bits = d.u8()?;
            Method::BasicPublish(BasicPublish {
                exchange,
                routing_key,
                mandatory: bits & 1 != 0,
                immediate: bits & (1 << 1) != 0,
            })
        }
        BASIC_RETURN => Method::BasicReturn(BasicReturn {
            reply_code: d.u16()?,
            reply_text: d.short_string()?,
            exchange: d.short_string()?,
            routing_key: d.short_string()?,
        }),
        BASIC_DELIVER => Method::BasicDeliver(BasicDeliver {
            consumer_tag: d.short_string()?,
            delivery_tag: d.u64()?,
            redelivered: d.u8()? & 1 != 0,
            exchange: d.short_string()?,
            routing_key: d.short_string()?,
        }),
        BASIC_GET => {
            let _ticket = d.u16()?;
            Method::BasicGet(BasicGet {
                queue: d.short_string()?,
                no_ack: d.u8()? & 1 != 0,
            })
        }
        BASIC_GET_OK => Method::BasicGetOk(BasicGetOk {
            delivery_tag: d.u64()?,
            redelivered: d.u8()? & 1 != 0,
            exchange: d.short_string()?,
            routing_key: d.short_string()?,
            message_count: d.u32()?,
        }),
        BASIC_GET_EMPTY => {
            let _reserved = d.short_string()?;
            Method::BasicGetEmpty
        }
        BASIC_ACK => Method::BasicAck(BasicAck {
            delivery_tag: d.u64()?,
            multiple: d.u8()? & 1 != 0,
        }),
        BASIC_NACK => {
            let delivery_tag = d.u64()?;
            let bits = d.u8()?;
            Method::BasicNack(BasicNack {
                delivery_tag,
                multiple: bits & 1 != 0,
                requeue: bits & (1 << 1) != 0,
            })
        }
        BASIC_REJECT => Method::BasicReject(BasicReject {
            delivery_tag: d.u64()?,
            requeue: d.u8()? & 1 != 0,
        }),
        BASIC_RECOVER => Method::BasicRecover(BasicRecover {
            requeue: d.u8()? & 1 != 0,
        }),
        BASIC_RECOVER_OK => Method::BasicRecoverOk,
        CONFIRM_SELECT => Method::ConfirmSelect(ConfirmSelect {
            nowait: d.u8()? & 1 != 0,
        }),
        CONFIRM_SELECT_OK => Method::ConfirmSelectOk,
        TX_SELECT => Method::TxSelect,
        TX_SELECT_OK => Method::TxSelectOk,
        TX_COMMIT => Method::TxCommit,
        TX_COMMIT_OK => Method::TxCommitOk,
        TX_ROLLBACK => Method::TxRollback,
        TX_ROLLBACK_OK => Method::TxRollbackOk,
        _ => return ReceivedMalformedSnafu.fail(),
    })
}
