use crate::proto::BasicReturn;
use crate::AmqpProperties;

/// A message returned by the server because it could not be routed (e.g., a
/// mandatory publish to an exchange with no matching binding).
#[derive(Clone, Debug)]
pub struct Return {
    /// AMQP reply code explaining why the message was returned.
    pub reply_code: u16,

    /// Human-readable reason the message was returned.
    pub reply_text: String,

    /// The exchange the message was published to.
    pub exchange: String,

    /// The routing key the message was published with.
    pub routing_key: String,

    /// The message body.
    pub content: Vec<u8>,

    /// The message properties.
    pub properties: AmqpProperties,
}

impl Return {
    pub(crate) fn new(ret: BasicReturn, content: Vec<u8>, properties: AmqpProperties) -> Return {
        Return {
            reply_code: ret.reply_code,
            reply_text: ret.reply_text,
            exchange: ret.exchange,
            routing_key: ret.routing_key,
            content,
            properties,
        }
    }
}
