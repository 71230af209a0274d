//! The AMQP field-table codec.
//!
//! Field tables carry typed named values in method arguments (e.g. queue
//! declare arguments) and in message header properties. The type tags follow
//! the RabbitMQ dialect of AMQP 0-9-1. Encoding and decoding are pure and
//! re-entrant; tables use a `BTreeMap` so encoding is deterministic.

use super::codec::Decoder;
use crate::errors::*;
use bytes::{BufMut, BytesMut};
use std::collections::BTreeMap;

/// A table of typed named values.
pub type FieldTable = BTreeMap<String, FieldValue>;

/// An exact-precision decimal value: `value / 10^scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decimal {
    pub scale: u8,
    pub value: u32,
}

/// A single value in a [`FieldTable`] or field array.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    ShortShortInt(i8),
    ShortShortUInt(u8),
    ShortInt(i16),
    ShortUInt(u16),
    LongInt(i32),
    LongUInt(u32),
    LongLongInt(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    LongString(String),
    FieldArray(Vec<FieldValue>),
    Timestamp(u64),
    FieldTable(FieldTable),
    Void,
    ByteArray(Vec<u8>),
}

pub(crate) fn encode_short_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    if s.len() > 255 {
        return ShortStringTooLongSnafu { length: s.len() }.fail();
    }
    buf.put_u8(s.len() as u8);
    buf.put(s.as_bytes());
    Ok(())
}

pub(crate) fn encode_long_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put(s.as_bytes());
}

pub(crate) fn encode_table(buf: &mut BytesMut, table: &FieldTable) -> Result<()> {
    let mut inner = BytesMut::new();
    for (name, value) in table {
        encode_short_string(&mut inner, name)?;
        encode_value(&mut inner, value)?;
    }
    buf.put_u32(inner.len() as u32);
    buf.put(inner);
    Ok(())
}

fn encode_value(buf: &mut BytesMut, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Boolean(v) => {
            buf.put_u8(b't');
            buf.put_u8(u8::from(*v));
        }
        FieldValue::ShortShortInt(v) => {
            buf.put_u8(b'b');
            buf.put_i8(*v);
        }
        FieldValue::ShortShortUInt(v) => {
            buf.put_u8(b'B');
            buf.put_u8(*v);
        }
        FieldValue::ShortInt(v) => {
            buf.put_u8(b's');
            buf.put_i16(*v);
        }
        FieldValue::ShortUInt(v) => {
            buf.put_u8(b'u');
            buf.put_u16(*v);
        }
        FieldValue::LongInt(v) => {
            buf.put_u8(b'I');
            buf.put_i32(*v);
        }
        FieldValue::LongUInt(v) => {
            buf.put_u8(b'i');
            buf.put_u32(*v);
        }
        FieldValue::LongLongInt(v) => {
            buf.put_u8(b'l');
            buf.put_i64(*v);
        }
        FieldValue::Float(v) => {
            buf.put_u8(b'f');
            buf.put_f32(*v);
        }
        FieldValue::Double(v) => {
            buf.put_u8(b'd');
            buf.put_f64(*v);
        }
        FieldValue::Decimal(v) => {
            buf.put_u8(b'D');
            buf.put_u8(v.scale);
            buf.put_u32(v.value);
        }
        FieldValue::LongString(v) => {
            buf.put_u8(b'S');
            encode_long_string(buf, v);
        }
        FieldValue::FieldArray(values) => {
            buf.put_u8(b'A');
            let mut inner = BytesMut::new();
            for v in values {
                encode_value(&mut inner, v)?;
            }
            buf.put_u32(inner.len() as u32);
            buf.put(inner);
        }
        FieldValue::Timestamp(v) => {
            buf.put_u8(b'T');
            buf.put_u64(*v);
        }
        FieldValue::FieldTable(table) => {
            buf.put_u8(b'F');
            encode_table(buf, table)?;
        }
        FieldValue::Void => buf.put_u8(b'V'),
        FieldValue::ByteArray(bytes) => {
            buf.put_u8(b'x');
            buf.put_u32(bytes.len() as u32);
            buf.put(bytes.as_slice());
        }
    }
    Ok(())
}

pub(crate) fn decode_table(d: &mut Decoder) -> Result<FieldTable> {
    let len = d.u32()? as usize;
    let mut inner = Decoder::new(d.take(len)?);
    let mut table = FieldTable::new();
    while !inner.is_empty() {
        let name = inner.short_string()?;
        let value = decode_value(&mut inner)?;
        table.insert(name, value);
    }
    Ok(table)
}

fn decode_value(d: &mut Decoder) -> Result<FieldValue> {
    Ok(match d.u8()? {
        b't' => FieldValue::Boolean(d.u8()? != 0),
        b'b' => FieldValue::ShortShortInt(d.i8()?),
        b'B' => FieldValue::ShortShortUInt(d.u8()?),
        b's' => FieldValue::ShortInt(d.i16()?),
        b'u' => FieldValue::ShortUInt(d.u16()?),
        b'I' => FieldValue::LongInt(d.i32()?),
        b'i' => FieldValue::LongUInt(d.u32()?),
        b'l' => FieldValue::LongLongInt(d.i64()?),
        b'f' => FieldValue::Float(d.f32()?),
        b'd' => FieldValue::Double(d.f64()?),
        b'D' => FieldValue::Decimal(Decimal {
            scale: d.u8()?,
            value: d.u32()?,
        }),
        b'S' => FieldValue::LongString(d.long_string()?),
        b'A' => {
            let len = d.u32()? as usize;
            let mut inner = Decoder::new(d.take(len)?);
            let mut values = Vec::new();
            while !inner.is_empty() {
                values.push(decode_value(&mut inner)?);
            }
            FieldValue::FieldArray(values)
        }
        b'T' => FieldValue::Timestamp(d.u64()?),
        b'F' => FieldValue::FieldTable(decode_table(d)?),
        b'V' => FieldValue::Void,
        b'x' => {
            let len = d.u32()? as usize;
            FieldValue::ByteArray(d.take(len)?.to_vec())
        }
        _ => return ReceivedMalformedSnafu.fail(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(table: &FieldTable) -> FieldTable {
        let mut buf = BytesMut::new();
        encode_table(&mut buf, table).unwrap();
        let mut d = Decoder::new(&buf);
        let decoded = decode_table(&mut d).unwrap();
        assert!(d.is_empty());
        decoded
    }

    #[test]
    fn empty_table() {
        let mut buf = BytesMut::new();
        encode_table(&mut buf, &FieldTable::new()).unwrap();
        assert_eq!(&buf[..], b"\x00\x00\x00\x00");
        assert_eq!(roundtrip(&FieldTable::new()), FieldTable::new());
    }

    #[test]
    fn every_value_tag_roundtrips() {
        let mut nested = FieldTable::new();
        nested.insert("inner".to_string(), FieldValue::Boolean(true));

        let mut table = FieldTable::new();
        table.insert("bool".to_string(), FieldValue::Boolean(false));
        table.insert("i8".to_string(), FieldValue::ShortShortInt(-5));
        table.insert("u8".to_string(), FieldValue::ShortShortUInt(200));
        table.insert("i16".to_string(), FieldValue::ShortInt(-2000));
        table.insert("u16".to_string(), FieldValue::ShortUInt(50_000));
        table.insert("i32".to_string(), FieldValue::LongInt(-70_000));
        table.insert("u32".to_string(), FieldValue::LongUInt(3_000_000_000));
        table.insert("i64".to_string(), FieldValue::LongLongInt(-1 << 40));
        table.insert("f32".to_string(), FieldValue::Float(1.5));
        table.insert("f64".to_string(), FieldValue::Double(-2.25));
        table.insert(
            "dec".to_string(),
            FieldValue::Decimal(Decimal {
                scale: 2,
                value: 12345,
            }),
        );
        table.insert(
            "str".to_string(),
            FieldValue::LongString("hello".to_string()),
        );
        table.insert(
            "arr".to_string(),
            FieldValue::FieldArray(vec![
                FieldValue::LongInt(1),
                FieldValue::LongString("two".to_string()),
                FieldValue::Void,
            ]),
        );
        table.insert("ts".to_string(), FieldValue::Timestamp(1_234_567_890));
        table.insert("tbl".to_string(), FieldValue::FieldTable(nested));
        table.insert("void".to_string(), FieldValue::Void);
        table.insert(
            "bytes".to_string(),
            FieldValue::ByteArray(vec![0, 1, 2, 0xFF]),
        );

        assert_eq!(roundtrip(&table), table);
    }

    #[test]
    fn known_encoding() {
        let mut table = FieldTable::new();
        table.insert("ab".to_string(), FieldValue::Boolean(true));
        let mut buf = BytesMut::new();
        encode_table(&mut buf, &table).unwrap();
        assert_eq!(&buf[..], b"\x00\x00\x00\x05\x02abt\x01");
    }

    #[test]
    fn unknown_tag_is_malformed() {
        // length 4, key "a", tag 'Z'
        let bytes = b"\x00\x00\x00\x03\x01aZ";
        let mut d = Decoder::new(bytes);
        match decode_table(&mut d) {
            Err(Error::ReceivedMalformed) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn truncated_table_is_malformed() {
        // declared length 10 but only 2 bytes of content
        let bytes = b"\x00\x00\x00\x0a\x01a";
        let mut d = Decoder::new(bytes);
        assert!(decode_table(&mut d).is_err());
    }

    #[test]
    fn overlong_short_string_rejected() {
        let mut buf = BytesMut::new();
        let long = "x".repeat(256);
        match encode_short_string(&mut buf, &long) {
            Err(Error::ShortStringTooLong { length }) => assert_eq!(length, 256),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
