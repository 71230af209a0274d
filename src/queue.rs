use crate::{Channel, Consumer, ConsumerOptions, Exchange, FieldTable, Get, Result};

/// Options passed to the server when declaring a queue.
///
/// The [`default`](#impl-Default) implementation sets all boolean fields to
/// false and has an empty set of arguments.
#[derive(Clone, Debug, Default)]
pub struct QueueDeclareOptions {
    /// If true, declares queue as durable (survives server restarts); if
    /// false, declares queue as transient (will be deleted on a server
    /// restart).
    pub durable: bool,

    /// If true, declares queue as exclusive: the queue may only be accessed
    /// by the current connection, and it will be deleted when the connection
    /// closes.
    pub exclusive: bool,

    /// If true, declares queue as auto-delete: the server will delete it once
    /// the last consumer is cancelled or its channel closed.
    pub auto_delete: bool,

    /// Extra arguments; these are optional in general, but may be needed for
    /// some plugins or server-specific features.
    pub arguments: FieldTable,
}

/// Options passed to the server when deleting a queue.
#[derive(Clone, Debug, Default)]
pub struct QueueDeleteOptions {
    /// If true, the server will only delete the queue if it has no consumers.
    pub if_unused: bool,

    /// If true, the server will only delete the queue if it has no messages.
    pub if_empty: bool,
}

/// Handle for a declared AMQP queue.
pub struct Queue<'a> {
    channel: &'a Channel,
    name: String,
    message_count: Option<u32>,
    consumer_count: Option<u32>,
}

impl std::fmt::Debug for Queue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("message_count", &self.message_count)
            .field("consumer_count", &self.consumer_count)
            .finish()
    }
}

impl Queue<'_> {
    pub(crate) fn new(
        channel: &Channel,
        name: String,
        message_count: Option<u32>,
        consumer_count: Option<u32>,
    ) -> Queue {
        Queue {
            channel,
            name,
            message_count,
            consumer_count,
        }
    }

    /// The name of this queue. If it was declared with an empty name, this is
    /// the name assigned by the server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of messages in the queue at the time of declaration, or
    /// `None` if the queue was declared with `nowait`.
    pub fn declared_message_count(&self) -> Option<u32> {
        self.message_count
    }

    /// The number of consumers attached to the queue at the time of
    /// declaration, or `None` if the queue was declared with `nowait`.
    pub fn declared_consumer_count(&self) -> Option<u32> {
        self.consumer_count
    }

    /// Synchronously get a single message from this queue; returns `None` if
    /// the queue is empty.
    pub fn get(&self, no_ack: bool) -> Result<Option<Get>> {
        self.channel.basic_get(self.name(), no_ack)
    }

    /// Start a consumer on this queue.
    pub fn consume(&self, options: ConsumerOptions) -> Result<Consumer> {
        self.channel.basic_consume(self.name(), options)
    }

    /// Bind this queue to an exchange.
    pub fn bind<S: Into<String>>(
        &self,
        exchange: &Exchange,
        routing_key: S,
        arguments: FieldTable,
    ) -> Result<()> {
        self.channel
            .queue_bind(self.name(), exchange.name(), routing_key, arguments)
    }

    /// Unbind this queue from an exchange.
    pub fn unbind<S: Into<String>>(
        &self,
        exchange: &Exchange,
        routing_key: S,
        arguments: FieldTable,
    ) -> Result<()> {
        self.channel
            .queue_unbind(self.name(), exchange.name(), routing_key, arguments)
    }

    /// Purge all messages from this queue, returning the number of messages
    /// purged.
    pub fn purge(&self) -> Result<u32> {
        self.channel.queue_purge(self.name())
    }

    /// Delete this queue, returning the number of messages deleted with it.
    pub fn delete(self, options: QueueDeleteOptions) -> Result<u32> {
        self.channel.queue_delete(self.name(), options)
    }
}
