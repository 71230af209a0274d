use crate::{AmqpProperties, Channel, FieldTable, Result};

/// Types of AMQP exchanges.
pub enum ExchangeType {
    /// Direct exchange; delivers messages to queues based on the routing key.
    Direct,

    /// Fanout exchange; delivers messages to all bound queues and ignores the
    /// routing key.
    Fanout,

    /// Topic exchange; delivers messages based on matching between a message
    /// routing key and the pattern that was used to bind a queue to an
    /// exchange.
    Topic,

    /// Headers exchange; ignores routing key and routes based on message
    /// header fields.
    Headers,

    /// Custom exchange type; should begin with "x-".
    Custom(String),
}

impl AsRef<str> for ExchangeType {
    fn as_ref(&self) -> &str {
        use self::ExchangeType::*;
        match self {
            Direct => "direct",
            Fanout => "fanout",
            Topic => "topic",
            Headers => "headers",
            Custom(s) => s,
        }
    }
}

/// Options passed to the server when declaring an exchange.
///
/// The [`default`](#impl-Default) implementation sets all boolean fields to
/// false and has an empty set of arguments.
#[derive(Clone, Debug, Default)]
pub struct ExchangeDeclareOptions {
    /// If true, declares exchange as durable (survives server restarts); if
    /// false, declares exchange as transient (will be deleted on a server
    /// restart).
    pub durable: bool,

    /// If true, declares exchange as auto-delete: it will be deleted once no
    /// queues are bound to it.
    pub auto_delete: bool,

    /// If true, declares exchange as internal: it may not be used by
    /// publishers, but only for exchange-to-exchange bindings.
    pub internal: bool,

    /// Extra arguments; these are optional in general, but may be needed for
    /// some plugins or server-specific features.
    pub arguments: FieldTable,
}

/// Handle for a declared AMQP exchange.
pub struct Exchange<'a> {
    channel: &'a Channel,
    name: String,
}

impl Exchange<'_> {
    pub(crate) fn new(channel: &Channel, name: String) -> Exchange {
        Exchange { channel, name }
    }

    /// The default direct exchange, which always exists and cannot be
    /// declared explicitly.
    pub fn direct(channel: &Channel) -> Exchange {
        Exchange::new(channel, String::new())
    }

    /// The name of this exchange.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish a message to this exchange.
    pub fn publish<T: AsRef<[u8]>, S: Into<String>>(
        &self,
        content: T,
        routing_key: S,
        mandatory: bool,
        properties: &AmqpProperties,
    ) -> Result<()> {
        self.channel
            .basic_publish(content, self.name(), routing_key, mandatory, properties)
    }

    /// Bind this exchange to `source`, so that messages published to `source`
    /// are routed to this exchange.
    pub fn bind_to_source<S: Into<String>>(
        &self,
        source: &Exchange,
        routing_key: S,
        arguments: FieldTable,
    ) -> Result<()> {
        self.channel
            .exchange_bind(self.name(), source.name(), routing_key, arguments)
    }

    /// Unbind this exchange from `source`.
    pub fn unbind_from_source<S: Into<String>>(
        &self,
        source: &Exchange,
        routing_key: S,
        arguments: FieldTable,
    ) -> Result<()> {
        self.channel
            .exchange_unbind(self.name(), source.name(), routing_key, arguments)
    }

    /// Delete this exchange.
    pub fn delete(self, if_unused: bool) -> Result<()> {
        self.channel.exchange_delete(self.name(), if_unused)
    }
}
