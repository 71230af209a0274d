use crate::proto::{BasicDeliver, BasicGetOk};
use crate::{AmqpProperties, Channel, Result};

/// A message delivered to a consumer or returned by a polling get.
#[derive(Clone, Debug)]
pub struct Delivery {
    delivery_tag: u64,

    /// True if this message has been delivered before (and was requeued).
    pub redelivered: bool,

    /// The exchange the message was published to.
    pub exchange: String,

    /// The routing key the message was published with.
    pub routing_key: String,

    /// The message body.
    pub content: Vec<u8>,

    /// The message properties.
    pub properties: AmqpProperties,
}

impl Delivery {
    pub(crate) fn new(
        deliver: BasicDeliver,
        content: Vec<u8>,
        properties: AmqpProperties,
    ) -> (String, Delivery) {
        (
            deliver.consumer_tag,
            Delivery {
                delivery_tag: deliver.delivery_tag,
                redelivered: deliver.redelivered,
                exchange: deliver.exchange,
                routing_key: deliver.routing_key,
                content,
                properties,
            },
        )
    }

    pub(crate) fn new_get_ok(
        get_ok: BasicGetOk,
        content: Vec<u8>,
        properties: AmqpProperties,
    ) -> Delivery {
        Delivery {
            delivery_tag: get_ok.delivery_tag,
            redelivered: get_ok.redelivered,
            exchange: get_ok.exchange,
            routing_key: get_ok.routing_key,
            content,
            properties,
        }
    }

    /// The delivery tag the server assigned to this message.
    #[inline]
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// Acknowledge this message on `channel`. Take care to only acknowledge
    /// deliveries on the channel they arrived on.
    #[inline]
    pub fn ack(&self, channel: &Channel) -> Result<()> {
        channel.basic_ack(self, false)
    }

    /// Acknowledge this message and all previously unacknowledged messages
    /// with lower delivery tags.
    #[inline]
    pub fn ack_multiple(&self, channel: &Channel) -> Result<()> {
        channel.basic_ack(self, true)
    }

    #[inline]
    pub fn nack(&self, channel: &Channel, requeue: bool) -> Result<()> {
        channel.basic_nack(self, false, requeue)
    }

    #[inline]
    pub fn nack_multiple(&self, channel: &Channel, requeue: bool) -> Result<()> {
        channel.basic_nack(self, true, requeue)
    }

    #[inline]
    pub fn reject(&self, channel: &Channel, requeue: bool) -> Result<()> {
        channel.basic_reject(self, requeue)
    }
}
