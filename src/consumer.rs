use crate::errors::*;
use crate::{Channel, Delivery, FieldTable};
use crossbeam_channel::Receiver;
use log::error;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

/// Options passed to the server when starting a consumer.
///
/// The [`default`](#impl-Default) implementation sets all boolean fields to
/// false, lets the server assign the consumer tag, and has an empty set of
/// arguments.
#[derive(Clone, Debug, Default)]
pub struct ConsumerOptions {
    /// Consumer tag to request. If empty (the default), the server assigns a
    /// unique tag.
    pub consumer_tag: String,

    /// If true, the server will not send this consumer messages that were
    /// published by the consumer's connection.
    pub no_local: bool,

    /// If true, the server assumes all delivered messages are acknowledged,
    /// and the client should not acknowledge messages.
    pub no_ack: bool,

    /// If true, requires that this consumer is the only one attached to the
    /// queue. If other consumers are active, the server will close the
    /// channel.
    pub exclusive: bool,

    /// Extra arguments; these are optional in general, but may be needed for
    /// some plugins or server-specific features.
    pub arguments: FieldTable,
}

/// Messages delivered to consumers.
// Clippy warns about ConsumerMessage::Delivery being much larger than the
// other variants, but we expect almost all instances of ConsumerMessage to be
// Deliveries.
#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug)]
pub enum ConsumerMessage {
    /// A delivered message.
    Delivery(Delivery),

    /// The consumer was cancelled by the client; e.g., by calling
    /// [`Consumer::cancel`](struct.Consumer.html#method.cancel).
    ClientCancelled,

    /// The consumer has been cancelled by the server; e.g., because the queue
    /// the consumer is attached to was deleted.
    ServerCancelled,

    /// The client has closed the channel where this consumer was created.
    ClientClosedChannel,

    /// The server has closed the channel where this consumer was created.
    ServerClosedChannel(Error),

    /// The client has closed the connection where this consumer was created.
    ClientClosedConnection,

    /// The server has closed the connection where this consumer was created.
    ServerClosedConnection(Error),
}

/// A message consumer associated with an AMQP queue.
///
/// Messages can be consumed on the calling thread by iterating over
/// [`receiver`](#method.receiver), or handed to a pool of worker threads with
/// [`start_workers`](#method.start_workers).
///
/// # Example
///
/// ```rust,no_run
/// use warren::{Consumer, ConsumerMessage, Result};
/// # use warren::Delivery;
///
/// # fn handle_delivery(_: Delivery) {}
/// // Receive (at least) n messages on the consumer, then cancel it.
/// fn consume_n_messages(consumer: Consumer, n: usize) -> Result<()> {
///     for (i, message) in consumer.receiver().iter().enumerate() {
///         match message {
///             ConsumerMessage::Delivery(delivery) => handle_delivery(delivery),
///             ConsumerMessage::ServerClosedChannel(err)
///             | ConsumerMessage::ServerClosedConnection(err) => return Err(err),
///             ConsumerMessage::ClientCancelled
///             | ConsumerMessage::ServerCancelled
///             | ConsumerMessage::ClientClosedChannel
///             | ConsumerMessage::ClientClosedConnection => break,
///         }
///         if i >= n {
///             consumer.cancel()?;
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct Consumer<'a> {
    channel: &'a Channel,
    consumer_tag: String,
    rx: Receiver<ConsumerMessage>,
    cancelled: Cell<bool>,
    workers: RefCell<Vec<JoinHandle<()>>>,
}

impl Drop for Consumer<'_> {
    fn drop(&mut self) {
        let _ = self.cancel();
    }
}

impl<'a> Consumer<'a> {
    pub(crate) fn new(
        channel: &'a Channel,
        consumer_tag: String,
        rx: Receiver<ConsumerMessage>,
    ) -> Consumer<'a> {
        Consumer {
            channel,
            consumer_tag,
            rx,
            cancelled: Cell::new(false),
            workers: RefCell::new(Vec::new()),
        }
    }

    /// The server-assigned consumer tag.
    #[inline]
    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// The `crossbeam_channel::Receiver` on which messages will be delivered.
    /// Once a consumer message of any variant other than
    /// [`Delivery`](enum.ConsumerMessage.html#variant.Delivery) has been
    /// received, no more messages will be sent and the sending side of the
    /// channel (held by the connection's reader thread) will be dropped.
    #[inline]
    pub fn receiver(&self) -> &Receiver<ConsumerMessage> {
        &self.rx
    }

    /// Spawns `worker_threads` threads that drain this consumer's mailbox
    /// into `callback`. Workers exit when the consumer is cancelled or its
    /// channel closes. A panicking callback is caught and logged; the worker
    /// keeps consuming.
    ///
    /// With a single worker the callback observes messages in the order the
    /// server delivered them; with more than one worker, ordering across
    /// workers is not preserved.
    pub fn start_workers<F>(&self, worker_threads: usize, callback: F)
    where
        F: Fn(Delivery) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let mut workers = self.workers.borrow_mut();
        for i in 0..worker_threads {
            let rx = self.rx.clone();
            let callback = Arc::clone(&callback);
            let handle = Builder::new()
                .name(format!("warren-consumer-{}-{}", self.consumer_tag, i))
                .spawn(move || {
                    for message in rx.iter() {
                        match message {
                            ConsumerMessage::Delivery(delivery) => {
                                let call = AssertUnwindSafe(|| callback(delivery));
                                if catch_unwind(call).is_err() {
                                    error!("consumer callback panicked; continuing");
                                }
                            }
                            _ => break,
                        }
                    }
                })
                .expect("failed to spawn consumer worker");
            workers.push(handle);
        }
    }

    /// Waits for all workers spawned by
    /// [`start_workers`](#method.start_workers) to exit. Workers only exit
    /// once the consumer has been cancelled or its channel has closed.
    pub fn join_workers(&self) {
        for handle in self.workers.borrow_mut().drain(..) {
            let _ = handle.join();
        }
    }

    /// Cancel this consumer.
    ///
    /// When the cancellation is acknowledged by the server, the channel
    /// returned by [`receiver`](#method.receiver) will receive a
    /// [`ConsumerMessage::ClientCancelled`](enum.ConsumerMessage.html#variant.ClientCancelled)
    /// message. This method does not consume `self` because cancellation is
    /// inherently racy; the server may be sending us additional messages as
    /// we are attempting to cancel.
    ///
    /// Calling this method a second or later time will always return `Ok`; if
    /// you care about cancellation errors, you must capture the `Err` value
    /// on the first call.
    pub fn cancel(&self) -> Result<()> {
        if self.cancelled.get() {
            return Ok(());
        }
        self.cancelled.set(true);
        self.channel.basic_cancel(self)
    }

    /// Calls [`Delivery::ack`](struct.Delivery.html#method.ack) on `delivery`
    /// using the channel that contains this consumer.
    #[inline]
    pub fn ack(&self, delivery: &Delivery) -> Result<()> {
        delivery.ack(self.channel)
    }

    /// Calls [`Delivery::nack`](struct.Delivery.html#method.nack) on
    /// `delivery` using the channel that contains this consumer.
    #[inline]
    pub fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<()> {
        delivery.nack(self.channel, requeue)
    }

    /// Calls [`Delivery::reject`](struct.Delivery.html#method.reject) on
    /// `delivery` using the channel that contains this consumer.
    #[inline]
    pub fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<()> {
        delivery.reject(self.channel, requeue)
    }
}
