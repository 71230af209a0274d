//! Content-header message properties.

use super::codec::Decoder;
use super::field_table::{self, FieldTable};
use crate::errors::*;
use bytes::{BufMut, BytesMut};

const FLAG_CONTENT_TYPE: u16 = 1 << 15;
const FLAG_CONTENT_ENCODING: u16 = 1 << 14;
const FLAG_HEADERS: u16 = 1 << 13;
const FLAG_DELIVERY_MODE: u16 = 1 << 12;
const FLAG_PRIORITY: u16 = 1 << 11;
const FLAG_CORRELATION_ID: u16 = 1 << 10;
const FLAG_REPLY_TO: u16 = 1 << 9;
const FLAG_EXPIRATION: u16 = 1 << 8;
const FLAG_MESSAGE_ID: u16 = 1 << 7;
const FLAG_TIMESTAMP: u16 = 1 << 6;
const FLAG_TYPE: u16 = 1 << 5;
const FLAG_USER_ID: u16 = 1 << 4;
const FLAG_APP_ID: u16 = 1 << 3;
const FLAG_CLUSTER_ID: u16 = 1 << 2;

// Bit 0 of the flag word signals a continuation word; no 0-9-1 class defines
// more than 14 properties, so a set continuation bit is a protocol error.
const FLAG_CONTINUATION: u16 = 1;

/// AMQP message properties, carried in the content header frame of every
/// published or delivered message.
///
/// Uses the builder pattern:
///
/// ```rust
/// use warren::AmqpProperties;
///
/// let properties = AmqpProperties::default()
///     .with_content_type("application/json".to_string())
///     .with_persistence(true);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AmqpProperties {
    content_type: Option<String>,
    content_encoding: Option<String>,
    headers: Option<FieldTable>,
    delivery_mode: Option<u8>,
    priority: Option<u8>,
    correlation_id: Option<String>,
    reply_to: Option<String>,
    expiration: Option<String>,
    message_id: Option<String>,
    timestamp: Option<u64>,
    type_: Option<String>,
    user_id: Option<String>,
    app_id: Option<String>,
    cluster_id: Option<String>,
}

macro_rules! prop_accessors {
    ($field:ident, $with:ident, $ty:ty) => {
        pub fn $with(mut self, $field: $ty) -> Self {
            self.$field = Some($field);
            self
        }

        pub fn $field(&self) -> Option<&$ty> {
            self.$field.as_ref()
        }
    };
}

impl AmqpProperties {
    prop_accessors!(content_type, with_content_type, String);
    prop_accessors!(content_encoding, with_content_encoding, String);
    prop_accessors!(headers, with_headers, FieldTable);
    prop_accessors!(delivery_mode, with_delivery_mode, u8);
    prop_accessors!(priority, with_priority, u8);
    prop_accessors!(correlation_id, with_correlation_id, String);
    prop_accessors!(reply_to, with_reply_to, String);
    prop_accessors!(expiration, with_expiration, String);
    prop_accessors!(message_id, with_message_id, String);
    prop_accessors!(timestamp, with_timestamp, u64);
    prop_accessors!(type_, with_type, String);
    prop_accessors!(user_id, with_user_id, String);
    prop_accessors!(app_id, with_app_id, String);
    prop_accessors!(cluster_id, with_cluster_id, String);

    /// Sets the delivery mode to persistent (2) or transient (1). Leaving the
    /// delivery mode unset lets the server apply its default.
    pub fn with_persistence(self, persistent: bool) -> Self {
        self.with_delivery_mode(if persistent { 2 } else { 1 })
    }

    fn flags(&self) -> u16 {
        let mut flags = 0;
        let mut flag = |present: bool, bit: u16| {
            if present {
                flags |= bit;
            }
        };
        flag(self.content_type.is_some(), FLAG_CONTENT_TYPE);
        flag(self.content_encoding.is_some(), FLAG_CONTENT_ENCODING);
        flag(self.headers.is_some(), FLAG_HEADERS);
        flag(self.delivery_mode.is_some(), FLAG_DELIVERY_MODE);
        flag(self.priority.is_some(), FLAG_PRIORITY);
        flag(self.correlation_id.is_some(), FLAG_CORRELATION_ID);
        flag(self.reply_to.is_some(), FLAG_REPLY_TO);
        flag(self.expiration.is_some(), FLAG_EXPIRATION);
        flag(self.message_id.is_some(), FLAG_MESSAGE_ID);
        flag(self.timestamp.is_some(), FLAG_TIMESTAMP);
        flag(self.type_.is_some(), FLAG_TYPE);
        flag(self.user_id.is_some(), FLAG_USER_ID);
        flag(self.app_id.is_some(), FLAG_APP_ID);
        flag(self.cluster_id.is_some(), FLAG_CLUSTER_ID);
        flags
    }

    /// Serializes the property flag word followed by the present properties,
    /// in flag order.
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        fn put_short(buf: &mut BytesMut, s: &Option<String>) -> Result<()> {
            if let Some(s) = s {
                field_table::encode_short_string(buf, s)?;
            }
            Ok(())
        }

        buf.put_u16(self.flags());
        put_short(buf, &self.content_type)?;
        put_short(buf, &self.content_encoding)?;
        if let Some(headers) = &self.headers {
            field_table::encode_table(buf, headers)?;
        }
        if let Some(mode) = self.delivery_mode {
            buf.put_u8(mode);
        }
        if let Some(priority) = self.priority {
            buf.put_u8(priority);
        }
        put_short(buf, &self.correlation_id)?;
        put_short(buf, &self.reply_to)?;
        put_short(buf, &self.expiration)?;
        put_short(buf, &self.message_id)?;
        if let Some(timestamp) = self.timestamp {
            buf.put_u64(timestamp);
        }
        put_short(buf, &self.type_)?;
        put_short(buf, &self.user_id)?;
        put_short(buf, &self.app_id)?;
        put_short(buf, &self.cluster_id)?;
        Ok(())
    }

    pub(crate) fn decode(d: &mut Decoder) -> Result<AmqpProperties> {
        let flags = d.u16()?;
        if flags & FLAG_CONTINUATION != 0 {
            return ReceivedMalformedSnafu.fail();
        }
        let mut properties = AmqpProperties::default();
        if flags & FLAG_CONTENT_TYPE != 0 {
            properties.content_type = Some(d.short_string()?);
        }
        if flags & FLAG_CONTENT_ENCODING != 0 {
            properties.content_encoding = Some(d.short_string()?);
        }
        if flags & FLAG_HEADERS != 0 {
            properties.headers = Some(field_table::decode_table(d)?);
        }
        if flags & FLAG_DELIVERY_MODE != 0 {
            properties.delivery_mode = Some(d.u8()?);
        }
        if flags & FLAG_PRIORITY != 0 {
            properties.priority = Some(d.u8()?);
        }
        if flags & FLAG_CORRELATION_ID != 0 {
            properties.correlation_id = Some(d.short_string()?);
        }
        if flags & FLAG_REPLY_TO != 0 {
            properties.reply_to = Some(d.short_string()?);
        }
        if flags & FLAG_EXPIRATION != 0 {
            properties.expiration = Some(d.short_string()?);
        }
        if flags & FLAG_MESSAGE_ID != 0 {
            properties.message_id = Some(d.short_string()?);
        }
        if flags & FLAG_TIMESTAMP != 0 {
            properties.timestamp = Some(d.u64()?);
        }
        if flags & FLAG_TYPE != 0 {
            properties.type_ = Some(d.short_string()?);
        }
        if flags & FLAG_USER_ID != 0 {
            properties.user_id = Some(d.short_string()?);
        }
        if flags & FLAG_APP_ID != 0 {
            properties.app_id = Some(d.short_string()?);
        }
        if flags & FLAG_CLUSTER_ID != 0 {
            properties.cluster_id = Some(d.short_string()?);
        }
        Ok(properties)
    }
}
