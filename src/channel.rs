use crate::confirm::Confirm;
use crate::connection::ConnectionInner;
use crate::consumer::ConsumerMessage;
use crate::errors::*;
use crate::proto::{
    self, method_name, BasicAck, BasicCancel, BasicConsume, BasicGet, BasicNack, BasicPublish,
    BasicQos, BasicRecover, BasicReject, ChannelClose, ClassMethod, ConfirmSelect,
    ExchangeBind as ExchangeBindArgs, ExchangeDeclare as ExchangeDeclareArgs,
    ExchangeDelete as ExchangeDeleteArgs, ExchangeUnbind as ExchangeUnbindArgs, Method,
    QueueBind as QueueBindArgs, QueueDeclare as QueueDeclareArgs, QueueDelete as QueueDeleteArgs,
    QueuePurge as QueuePurgeArgs, QueueUnbind as QueueUnbindArgs,
};
use crate::serialize::OutputBuffer;
use crate::{
    AmqpProperties, Consumer, ConsumerOptions, Delivery, Exchange, ExchangeDeclareOptions,
    ExchangeType, Get, Queue, QueueDeclareOptions, QueueDeleteOptions, Return,
};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// A reply routed to a synchronous caller by the connection reader.
pub(crate) enum ChannelReply {
    Method(Method),

    /// basic.consume-ok, with the consumer mailbox the reader registered
    /// before forwarding the tag.
    ConsumeStarted(String, Receiver<ConsumerMessage>),
}

/// A reply routed to a caller blocked in `basic_get`.
pub(crate) enum GetReply {
    Get(Box<Get>),
    Empty,
}

/// Publisher-confirm bookkeeping for one channel.
///
/// `unconfirmed` holds the strictly increasing delivery tags of publishes the
/// server has not yet confirmed. `any_nack` covers the current drain window:
/// it is set by any nack and reset when `unconfirmed` drains to empty, at
/// which point every waiter is released with `!any_nack`.
pub(crate) struct ConfirmState {
    pub(crate) enabled: bool,
    pub(crate) next_tag: u64,
    pub(crate) unconfirmed: BTreeSet<u64>,
    any_nack: bool,
    waiters: Vec<Sender<bool>>,
}

impl ConfirmState {
    fn new() -> ConfirmState {
        ConfirmState {
            enabled: false,
            next_tag: 1,
            unconfirmed: BTreeSet::new(),
            any_nack: false,
            waiters: Vec::new(),
        }
    }
}

/// Channel state shared between the public [`Channel`] handle and the
/// connection reader.
pub(crate) struct ChannelShared {
    pub(crate) id: u16,

    /// The recorded close reason, set exactly once. Operations against a
    /// closed channel fail with a clone of this error.
    pub(crate) closed: Mutex<Option<Error>>,

    /// Consumer mailboxes by consumer tag. The reader inserts on
    /// basic.consume-ok and removes on cancellation.
    pub(crate) consumers: Mutex<HashMap<String, Sender<ConsumerMessage>>>,

    pub(crate) confirms: Mutex<ConfirmState>,

    /// Where basic.return messages go, if anyone is listening.
    pub(crate) return_listener: Mutex<Option<Sender<Return>>>,
}

impl ChannelShared {
    pub(crate) fn new(id: u16) -> ChannelShared {
        ChannelShared {
            id,
            closed: Mutex::new(None),
            consumers: Mutex::new(HashMap::new()),
            confirms: Mutex::new(ConfirmState::new()),
            return_listener: Mutex::new(None),
        }
    }

    /// Records `reason` (unless a reason is already recorded) and closes
    /// every mailbox hanging off this channel: consumers get a terminal
    /// message, confirm waiters are dropped (waking them with the recorded
    /// reason), and the return listener is detached.
    pub(crate) fn teardown(&self, reason: Error) {
        let terminal = consumer_teardown_message(&reason);
        self.closed.lock().unwrap().get_or_insert(reason);
        for (_, tx) in self.consumers.lock().unwrap().drain() {
            let _ = tx.send(terminal.clone());
        }
        let mut confirms = self.confirms.lock().unwrap();
        confirms.waiters.clear();
        *self.return_listener.lock().unwrap() = None;
    }

    /// Applies an ack or nack from the server to the unconfirmed set,
    /// releasing `wait_for_confirms` waiters when the set drains.
    pub(crate) fn handle_confirm(&self, confirm: Confirm) {
        let mut state = self.confirms.lock().unwrap();
        if !state.enabled {
            warn!(
                "received publisher confirm on channel {} without confirm mode",
                self.id
            );
            return;
        }
        let (payload, is_nack) = match confirm {
            Confirm::Ack(payload) => (payload, false),
            Confirm::Nack(payload) => (payload, true),
        };
        if payload.multiple {
            let rest = state.unconfirmed.split_off(&(payload.delivery_tag + 1));
            state.unconfirmed = rest;
        } else if !state.unconfirmed.remove(&payload.delivery_tag) {
            warn!(
                "received confirm for unknown delivery tag {} on channel {}",
                payload.delivery_tag, self.id
            );
        }
        if is_nack {
            state.any_nack = true;
        }
        if state.unconfirmed.is_empty() {
            let all_acked = !state.any_nack;
            state.any_nack = false;
            for waiter in state.waiters.drain(..) {
                let _ = waiter.send(all_acked);
            }
        }
    }
}

fn consumer_teardown_message(reason: &Error) -> ConsumerMessage {
    match reason {
        Error::ClientClosedChannel { .. } => ConsumerMessage::ClientClosedChannel,
        Error::ServerClosedChannel { .. } => ConsumerMessage::ServerClosedChannel(reason.clone()),
        Error::ClientClosedConnection => ConsumerMessage::ClientClosedConnection,
        other => ConsumerMessage::ServerClosedConnection(other.clone()),
    }
}

/// A logical AMQP channel multiplexed over a [`Connection`](struct.Connection.html).
///
/// Channels are `Sync`; fire-and-forget operations (publish, ack, nack,
/// reject) may run concurrently from multiple threads, while synchronous
/// operations serialize on an internal lock so request/reply pairs stay in
/// FIFO order.
///
/// Every method that awaits a server reply can fail with
/// `Error::ServerClosedChannel`, `Error::ClientClosedChannel`, or a
/// connection-level close reason if the channel or connection closes while
/// waiting.
pub struct Channel {
    inner: Arc<ConnectionInner>,
    shared: Arc<ChannelShared>,
    replies_rx: Receiver<ChannelReply>,
    gets_rx: Receiver<GetReply>,
    rpc: Mutex<()>,
}

impl Drop for Channel {
    fn drop(&mut self) {
        let _ = self.close_impl();
    }
}

impl Channel {
    pub(crate) fn new(
        inner: Arc<ConnectionInner>,
        shared: Arc<ChannelShared>,
        replies_rx: Receiver<ChannelReply>,
        gets_rx: Receiver<GetReply>,
    ) -> Channel {
        Channel {
            inner,
            shared,
            replies_rx,
            gets_rx,
            rpc: Mutex::new(()),
        }
    }

    /// The id of this channel within its connection.
    #[inline]
    pub fn channel_id(&self) -> u16 {
        self.shared.id
    }

    pub(crate) fn open_handshake(&self) -> Result<()> {
        debug!("opening channel {}", self.shared.id);
        self.call(Method::ChannelOpen, proto::CHANNEL_OPEN_OK)
            .map(drop)
    }

    /// Close this channel with a normal reply code.
    pub fn close(self) -> Result<()> {
        self.close_impl()
    }

    fn close_impl(&self) -> Result<()> {
        let _rpc = self.rpc.lock().unwrap();
        if self.shared.closed.lock().unwrap().is_some() {
            return Ok(());
        }
        debug!("closing channel {}", self.shared.id);
        let close = Method::ChannelClose(ChannelClose {
            reply_code: proto::REPLY_SUCCESS,
            reply_text: "goodbye".to_string(),
            class_id: 0,
            method_id: 0,
        });
        let buf = OutputBuffer::with_method(self.shared.id, &close)?;
        self.inner.write_frames(buf)?;
        match self.replies_rx.recv() {
            Ok(ChannelReply::Method(Method::ChannelCloseOk)) => Ok(()),
            Ok(ChannelReply::Method(method)) => {
                Err(self.unexpected_frame(proto::CHANNEL_CLOSE_OK, method.name()))
            }
            Ok(ChannelReply::ConsumeStarted(_, _)) => {
                Err(self.unexpected_frame(proto::CHANNEL_CLOSE_OK, "basic.consume-ok"))
            }
            // The reader tore this channel down while we were waiting; a
            // client-initiated teardown is still a clean close.
            Err(_) => match self.closed_reason() {
                Error::ClientClosedChannel { .. } => Ok(()),
                reason => Err(reason),
            },
        }
    }

    /// Marks the channel closed without talking to the server. Used when
    /// channel.open fails and the slot has already been released.
    pub(crate) fn abandon(&self, reason: Error) {
        self.shared.teardown(reason);
    }

    // Exchange operations

    /// Declare an exchange of the given type.
    pub fn exchange_declare<S: Into<String>>(
        &self,
        type_: ExchangeType,
        name: S,
        options: ExchangeDeclareOptions,
    ) -> Result<Exchange> {
        let name = name.into();
        self.exchange_declare_common(type_, name.clone(), false, false, options)?;
        Ok(Exchange::new(self, name))
    }

    /// Passively declare an exchange: fails if an exchange with the given
    /// name does not already exist.
    pub fn exchange_declare_passive<S: Into<String>>(&self, name: S) -> Result<Exchange> {
        let name = name.into();
        self.exchange_declare_common(
            ExchangeType::Direct,
            name.clone(),
            true,
            false,
            ExchangeDeclareOptions::default(),
        )?;
        Ok(Exchange::new(self, name))
    }

    /// Declare an exchange without waiting for declare-ok.
    pub fn exchange_declare_nowait<S: Into<String>>(
        &self,
        type_: ExchangeType,
        name: S,
        options: ExchangeDeclareOptions,
    ) -> Result<Exchange> {
        let name = name.into();
        self.exchange_declare_common(type_, name.clone(), false, true, options)?;
        Ok(Exchange::new(self, name))
    }

    fn exchange_declare_common(
        &self,
        type_: ExchangeType,
        name: String,
        passive: bool,
        nowait: bool,
        options: ExchangeDeclareOptions,
    ) -> Result<()> {
        let declare = Method::ExchangeDeclare(ExchangeDeclareArgs {
            exchange: name,
            type_: type_.as_ref().to_string(),
            passive,
            durable: options.durable,
            auto_delete: options.auto_delete,
            internal: options.internal,
            nowait,
            arguments: options.arguments,
        });
        if nowait {
            let _rpc = self.rpc.lock().unwrap();
            self.send_method(declare)
        } else {
            self.call(declare, proto::EXCHANGE_DECLARE_OK).map(drop)
        }
    }

    pub fn exchange_delete<S: Into<String>>(&self, name: S, if_unused: bool) -> Result<()> {
        let delete = Method::ExchangeDelete(ExchangeDeleteArgs {
            exchange: name.into(),
            if_unused,
            nowait: false,
        });
        self.call(delete, proto::EXCHANGE_DELETE_OK).map(drop)
    }

    pub fn exchange_delete_nowait<S: Into<String>>(&self, name: S, if_unused: bool) -> Result<()> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::ExchangeDelete(ExchangeDeleteArgs {
            exchange: name.into(),
            if_unused,
            nowait: true,
        }))
    }

    /// Bind exchange `destination` to exchange `source`.
    pub fn exchange_bind<S0: Into<String>, S1: Into<String>, S2: Into<String>>(
        &self,
        destination: S0,
        source: S1,
        routing_key: S2,
        arguments: crate::FieldTable,
    ) -> Result<()> {
        let bind = Method::ExchangeBind(ExchangeBindArgs {
            destination: destination.into(),
            source: source.into(),
            routing_key: routing_key.into(),
            nowait: false,
            arguments,
        });
        self.call(bind, proto::EXCHANGE_BIND_OK).map(drop)
    }

    /// Unbind exchange `destination` from exchange `source`.
    pub fn exchange_unbind<S0: Into<String>, S1: Into<String>, S2: Into<String>>(
        &self,
        destination: S0,
        source: S1,
        routing_key: S2,
        arguments: crate::FieldTable,
    ) -> Result<()> {
        let unbind = Method::ExchangeUnbind(ExchangeUnbindArgs {
            destination: destination.into(),
            source: source.into(),
            routing_key: routing_key.into(),
            nowait: false,
            arguments,
        });
        self.call(unbind, proto::EXCHANGE_UNBIND_OK).map(drop)
    }

    // Queue operations

    /// Declare a queue. Declaring with an empty name asks the server to
    /// assign one; server-named queues are forced to be exclusive, transient,
    /// and auto-delete.
    pub fn queue_declare<S: Into<String>>(
        &self,
        queue: S,
        options: QueueDeclareOptions,
    ) -> Result<Queue> {
        self.queue_declare_common(queue.into(), false, options)
    }

    /// Passively declare a queue: fails if a queue with the given name does
    /// not already exist.
    pub fn queue_declare_passive<S: Into<String>>(&self, queue: S) -> Result<Queue> {
        self.queue_declare_common(queue.into(), true, QueueDeclareOptions::default())
    }

    fn queue_declare_common(
        &self,
        queue: String,
        passive: bool,
        options: QueueDeclareOptions,
    ) -> Result<Queue> {
        let declare = Method::QueueDeclare(self.make_queue_declare(queue, passive, false, options));
        match self.call(declare, proto::QUEUE_DECLARE_OK)? {
            Method::QueueDeclareOk(ok) => Ok(Queue::new(
                self,
                ok.queue,
                Some(ok.message_count),
                Some(ok.consumer_count),
            )),
            _ => unreachable!("call() checked the reply discriminant"),
        }
    }

    /// Declare a queue without waiting for declare-ok. The queue name must
    /// not be empty (a server-assigned name can only be learned from the
    /// reply).
    pub fn queue_declare_nowait<S: Into<String>>(
        &self,
        queue: S,
        options: QueueDeclareOptions,
    ) -> Result<Queue> {
        let queue = queue.into();
        let declare =
            Method::QueueDeclare(self.make_queue_declare(queue.clone(), false, true, options));
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(declare)?;
        Ok(Queue::new(self, queue, None, None))
    }

    fn make_queue_declare(
        &self,
        queue: String,
        passive: bool,
        nowait: bool,
        options: QueueDeclareOptions,
    ) -> QueueDeclareArgs {
        // A server-named queue only makes sense as an exclusive transient;
        // force the flags so redeclaration of the generated name cannot
        // conflict.
        let options = if queue.is_empty() {
            QueueDeclareOptions {
                durable: false,
                exclusive: true,
                auto_delete: true,
                arguments: options.arguments,
            }
        } else {
            options
        };
        QueueDeclareArgs {
            queue,
            passive,
            durable: options.durable,
            exclusive: options.exclusive,
            auto_delete: options.auto_delete,
            nowait,
            arguments: options.arguments,
        }
    }

    pub fn queue_bind<S0: Into<String>, S1: Into<String>, S2: Into<String>>(
        &self,
        queue: S0,
        exchange: S1,
        routing_key: S2,
        arguments: crate::FieldTable,
    ) -> Result<()> {
        let bind = Method::QueueBind(QueueBindArgs {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            nowait: false,
            arguments,
        });
        self.call(bind, proto::QUEUE_BIND_OK).map(drop)
    }

    pub fn queue_bind_nowait<S0: Into<String>, S1: Into<String>, S2: Into<String>>(
        &self,
        queue: S0,
        exchange: S1,
        routing_key: S2,
        arguments: crate::FieldTable,
    ) -> Result<()> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::QueueBind(QueueBindArgs {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            nowait: true,
            arguments,
        }))
    }

    pub fn queue_unbind<S0: Into<String>, S1: Into<String>, S2: Into<String>>(
        &self,
        queue: S0,
        exchange: S1,
        routing_key: S2,
        arguments: crate::FieldTable,
    ) -> Result<()> {
        let unbind = Method::QueueUnbind(QueueUnbindArgs {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            arguments,
        });
        self.call(unbind, proto::QUEUE_UNBIND_OK).map(drop)
    }

    /// Purge all messages from a queue, returning the number purged.
    pub fn queue_purge<S: Into<String>>(&self, queue: S) -> Result<u32> {
        let purge = Method::QueuePurge(QueuePurgeArgs {
            queue: queue.into(),
            nowait: false,
        });
        match self.call(purge, proto::QUEUE_PURGE_OK)? {
            Method::QueuePurgeOk(ok) => Ok(ok.message_count),
            _ => unreachable!("call() checked the reply discriminant"),
        }
    }

    pub fn queue_purge_nowait<S: Into<String>>(&self, queue: S) -> Result<()> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::QueuePurge(QueuePurgeArgs {
            queue: queue.into(),
            nowait: true,
        }))
    }

    /// Delete a queue, returning the number of messages deleted with it.
    pub fn queue_delete<S: Into<String>>(
        &self,
        queue: S,
        options: QueueDeleteOptions,
    ) -> Result<u32> {
        let delete = Method::QueueDelete(QueueDeleteArgs {
            queue: queue.into(),
            if_unused: options.if_unused,
            if_empty: options.if_empty,
            nowait: false,
        });
        match self.call(delete, proto::QUEUE_DELETE_OK)? {
            Method::QueueDeleteOk(ok) => Ok(ok.message_count),
            _ => unreachable!("call() checked the reply discriminant"),
        }
    }

    pub fn queue_delete_nowait<S: Into<String>>(
        &self,
        queue: S,
        options: QueueDeleteOptions,
    ) -> Result<()> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::QueueDelete(QueueDeleteArgs {
            queue: queue.into(),
            if_unused: options.if_unused,
            if_empty: options.if_empty,
            nowait: true,
        }))
    }

    // Basic operations

    /// Set the prefetch window for this channel (or, if `global`, for the
    /// whole connection).
    pub fn basic_qos(&self, prefetch_size: u32, prefetch_count: u16, global: bool) -> Result<()> {
        let qos = Method::BasicQos(BasicQos {
            prefetch_size,
            prefetch_count,
            global,
        });
        self.call(qos, proto::BASIC_QOS_OK).map(drop)
    }

    /// Synchronously poll a queue for a message; returns `None` if the queue
    /// is empty.
    pub fn basic_get<S: Into<String>>(&self, queue: S, no_ack: bool) -> Result<Option<Get>> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::BasicGet(BasicGet {
            queue: queue.into(),
            no_ack,
        }))?;
        match self.gets_rx.recv() {
            Ok(GetReply::Get(get)) => Ok(Some(*get)),
            Ok(GetReply::Empty) => Ok(None),
            Err(_) => Err(self.closed_reason()),
        }
    }

    /// Publish a message. The method, header, and body frames are written
    /// atomically with respect to other channels of this connection; bodies
    /// larger than the negotiated frame size are split into multiple frames.
    ///
    /// If publisher confirms are enabled on this channel, the message is
    /// assigned the next confirm tag; use
    /// [`wait_for_confirms`](#method.wait_for_confirms) to await the server's
    /// verdict.
    pub fn basic_publish<T: AsRef<[u8]>, S0: Into<String>, S1: Into<String>>(
        &self,
        content: T,
        exchange: S0,
        routing_key: S1,
        mandatory: bool,
        properties: &AmqpProperties,
    ) -> Result<()> {
        self.check_open()?;
        let publish = Method::BasicPublish(BasicPublish {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            mandatory,
            immediate: false,
        });
        let mut buf = OutputBuffer::with_method(self.shared.id, &publish)?;
        buf.push_content(
            self.shared.id,
            proto::CLASS_BASIC,
            properties,
            content.as_ref(),
            self.inner.frame_max(),
        )?;
        self.inner.write_publish(buf, &self.shared)
    }

    /// Publish in confirm mode and wait for the server's verdict. Enables
    /// confirm mode on first use. Returns true iff the server acked every
    /// outstanding publish in the drain window.
    pub fn basic_publish_confirm<T: AsRef<[u8]>, S0: Into<String>, S1: Into<String>>(
        &self,
        content: T,
        exchange: S0,
        routing_key: S1,
        mandatory: bool,
        properties: &AmqpProperties,
    ) -> Result<bool> {
        self.confirm_select(true)?;
        self.basic_publish(content, exchange, routing_key, mandatory, properties)?;
        self.wait_for_confirms()
    }

    /// Put this channel into publisher-confirm mode. A no-op if confirm mode
    /// is already enabled.
    pub fn confirm_select(&self, nowait: bool) -> Result<()> {
        if self.shared.confirms.lock().unwrap().enabled {
            return Ok(());
        }
        let _rpc = self.rpc.lock().unwrap();
        if self.shared.confirms.lock().unwrap().enabled {
            return Ok(());
        }
        self.send_method(Method::ConfirmSelect(ConfirmSelect { nowait }))?;
        if !nowait {
            self.expect_reply(proto::CONFIRM_SELECT_OK)?;
        }
        let mut confirms = self.shared.confirms.lock().unwrap();
        confirms.enabled = true;
        confirms.next_tag = 1;
        Ok(())
    }

    /// Block until every unconfirmed publish has been acked or nacked.
    /// Returns immediately with true if nothing is unconfirmed. Returns false
    /// if any publish in the drain window was nacked.
    pub fn wait_for_confirms(&self) -> Result<bool> {
        let rx = {
            let mut confirms = self.shared.confirms.lock().unwrap();
            if confirms.unconfirmed.is_empty() {
                return Ok(true);
            }
            let (tx, rx) = crossbeam_channel::bounded(1);
            confirms.waiters.push(tx);
            rx
        };
        // Teardown records the close reason before dropping waiters, so a
        // waiter registered after teardown must bail out here instead of
        // blocking on a drain that will never come.
        if let Some(reason) = self.shared.closed.lock().unwrap().clone() {
            return Err(reason);
        }
        match rx.recv() {
            Ok(all_acked) => Ok(all_acked),
            Err(_) => Err(self.closed_reason()),
        }
    }

    /// Start a consumer. Messages are pushed to the returned consumer's
    /// mailbox by the connection reader; consume them on the calling thread
    /// via [`Consumer::receiver`](struct.Consumer.html#method.receiver) or
    /// hand them to worker threads via
    /// [`Consumer::start_workers`](struct.Consumer.html#method.start_workers).
    pub fn basic_consume<S: Into<String>>(
        &self,
        queue: S,
        options: ConsumerOptions,
    ) -> Result<Consumer> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::BasicConsume(BasicConsume {
            queue: queue.into(),
            consumer_tag: options.consumer_tag,
            no_local: options.no_local,
            no_ack: options.no_ack,
            exclusive: options.exclusive,
            nowait: false,
            arguments: options.arguments,
        }))?;
        match self.recv_reply()? {
            ChannelReply::ConsumeStarted(tag, rx) => Ok(Consumer::new(self, tag, rx)),
            ChannelReply::Method(method) => {
                Err(self.unexpected_frame(proto::BASIC_CONSUME_OK, method.name()))
            }
        }
    }

    /// Cancel a consumer. The consumer's mailbox receives a
    /// `ClientCancelled` terminal message once the server confirms.
    pub fn basic_cancel(&self, consumer: &Consumer) -> Result<()> {
        let cancel = Method::BasicCancel(BasicCancel {
            consumer_tag: consumer.consumer_tag().to_string(),
            nowait: false,
        });
        self.call(cancel, proto::BASIC_CANCEL_OK).map(drop)
    }

    /// Cancel a consumer without waiting for cancel-ok. The mailbox is closed
    /// immediately; deliveries already in flight from the server are dropped.
    pub fn basic_cancel_nowait(&self, consumer: &Consumer) -> Result<()> {
        let consumer_tag = consumer.consumer_tag().to_string();
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(Method::BasicCancel(BasicCancel {
            consumer_tag: consumer_tag.clone(),
            nowait: true,
        }))?;
        if let Some(tx) = self.shared.consumers.lock().unwrap().remove(&consumer_tag) {
            let _ = tx.send(ConsumerMessage::ClientCancelled);
        }
        Ok(())
    }

    /// Acknowledge a delivery. Fire-and-forget: no server reply is awaited.
    pub fn basic_ack(&self, delivery: &Delivery, multiple: bool) -> Result<()> {
        self.send_method(Method::BasicAck(BasicAck {
            delivery_tag: delivery.delivery_tag(),
            multiple,
        }))
    }

    /// Reject one or more deliveries. Fire-and-forget.
    pub fn basic_nack(&self, delivery: &Delivery, multiple: bool, requeue: bool) -> Result<()> {
        self.send_method(Method::BasicNack(BasicNack {
            delivery_tag: delivery.delivery_tag(),
            multiple,
            requeue,
        }))
    }

    /// Reject a delivery. Fire-and-forget.
    pub fn basic_reject(&self, delivery: &Delivery, requeue: bool) -> Result<()> {
        self.send_method(Method::BasicReject(BasicReject {
            delivery_tag: delivery.delivery_tag(),
            requeue,
        }))
    }

    /// Ask the server to redeliver all unacknowledged messages, requeueing
    /// them if `requeue` is set.
    pub fn basic_recover(&self, requeue: bool) -> Result<()> {
        self.call(
            Method::BasicRecover(BasicRecover { requeue }),
            proto::BASIC_RECOVER_OK,
        )
        .map(drop)
    }

    // Transactions

    /// Put this channel into transactional mode.
    pub fn tx_select(&self) -> Result<()> {
        self.call(Method::TxSelect, proto::TX_SELECT_OK).map(drop)
    }

    /// Commit the current transaction.
    pub fn tx_commit(&self) -> Result<()> {
        self.call(Method::TxCommit, proto::TX_COMMIT_OK).map(drop)
    }

    /// Roll back the current transaction.
    pub fn tx_rollback(&self) -> Result<()> {
        self.call(Method::TxRollback, proto::TX_ROLLBACK_OK)
            .map(drop)
    }

    /// Register a listener for messages the server returns as unroutable
    /// (mandatory publishes with no matching queue). Without a listener,
    /// returned messages are logged and dropped.
    pub fn listen_for_returns(&self) -> Receiver<Return> {
        let (tx, rx) = crossbeam_channel::unbounded();
        *self.shared.return_listener.lock().unwrap() = Some(tx);
        rx
    }

    // Plumbing

    fn check_open(&self) -> Result<()> {
        match &*self.shared.closed.lock().unwrap() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn closed_reason(&self) -> Error {
        self.shared
            .closed
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Error::UnexpectedSocketClose)
    }

    fn send_method(&self, method: Method) -> Result<()> {
        self.check_open()?;
        let buf = OutputBuffer::with_method(self.shared.id, &method)?;
        self.inner.write_frames(buf)
    }

    fn call(&self, method: Method, expected: ClassMethod) -> Result<Method> {
        let _rpc = self.rpc.lock().unwrap();
        self.send_method(method)?;
        self.expect_reply(expected)
    }

    fn recv_reply(&self) -> Result<ChannelReply> {
        self.replies_rx.recv().map_err(|_| self.closed_reason())
    }

    fn expect_reply(&self, expected: ClassMethod) -> Result<Method> {
        match self.recv_reply()? {
            ChannelReply::Method(method) => {
                if method.class_method() == expected {
                    Ok(method)
                } else {
                    Err(self.unexpected_frame(expected, method.name()))
                }
            }
            ChannelReply::ConsumeStarted(_, _) => {
                Err(self.unexpected_frame(expected, "basic.consume-ok"))
            }
        }
    }

    /// A synchronous wait got the wrong method: record the protocol
    /// violation, close the channel with UNEXPECTED_FRAME, and hand the error
    /// back to the caller.
    fn unexpected_frame(&self, expected: ClassMethod, actual: &str) -> Error {
        let err = Error::FrameUnexpected {
            expected: method_name(expected),
            actual: actual.to_string(),
        };
        warn!(
            "channel {}: {}; closing channel with code {}",
            self.shared.id,
            err,
            proto::UNEXPECTED_FRAME
        );
        self.shared
            .closed
            .lock()
            .unwrap()
            .get_or_insert(err.clone());
        let close = Method::ChannelClose(ChannelClose {
            reply_code: proto::UNEXPECTED_FRAME,
            reply_text: "unexpected frame".to_string(),
            class_id: (expected >> 16) as u16,
            method_id: expected as u16,
        });
        if let Ok(buf) = OutputBuffer::with_method(self.shared.id, &close) {
            let _ = self.inner.write_frames(buf);
        }
        err
    }
}
