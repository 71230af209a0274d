//! Wire-level types for AMQP 0-9-1.
//!
//! Methods are represented as a closed enum whose discriminant corresponds to
//! the packed `(class-id << 16) | method-id` pair from the protocol
//! specification; per-method argument structs carry named fields in wire
//! order. [`codec`] holds the frame encoders and decoders, [`field_table`]
//! the typed field-value codec, and [`properties`] the content-header
//! property list.

pub mod codec;
pub mod field_table;
pub mod properties;

pub use field_table::FieldTable;
pub use properties::AmqpProperties;

pub type ChannelId = u16;
pub type ClassMethod = u32;

pub const CLASS_CONNECTION: u16 = 10;
pub const CLASS_CHANNEL: u16 = 20;
pub const CLASS_EXCHANGE: u16 = 40;
pub const CLASS_QUEUE: u16 = 50;
pub const CLASS_BASIC: u16 = 60;
pub const CLASS_CONFIRM: u16 = 85;
pub const CLASS_TX: u16 = 90;

pub const CONNECTION_START: u32 = 0x000A_000A;
pub const CONNECTION_START_OK: u32 = 0x000A_000B;
pub const CONNECTION_SECURE: u32 = 0x000A_0014;
pub const CONNECTION_SECURE_OK: u32 = 0x000A_0015;
pub const CONNECTION_TUNE: u32 = 0x000A_001E;
pub const CONNECTION_TUNE_OK: u32 = 0x000A_001F;
pub const CONNECTION_OPEN: u32 = 0x000A_0028;
pub const CONNECTION_OPEN_OK: u32 = 0x000A_0029;
pub const CONNECTION_CLOSE: u32 = 0x000A_0032;
pub const CONNECTION_CLOSE_OK: u32 = 0x000A_0033;
pub const CONNECTION_BLOCKED: u32 = 0x000A_003C;
pub const CONNECTION_UNBLOCKED: u32 = 0x000A_003D;

pub const CHANNEL_OPEN: u32 = 0x0014_000A;
pub const CHANNEL_OPEN_OK: u32 = 0x0014_000B;
pub const CHANNEL_CLOSE: u32 = 0x0014_0028;
pub const CHANNEL_CLOSE_OK: u32 = 0x0014_0029;

pub const EXCHANGE_DECLARE: u32 = 0x0028_000A;
pub const EXCHANGE_DECLARE_OK: u32 = 0x0028_000B;
pub const EXCHANGE_DELETE: u32 = 0x0028_0014;
pub const EXCHANGE_DELETE_OK: u32 = 0x0028_0015;
pub const EXCHANGE_BIND: u32 = 0x0028_001E;
pub const EXCHANGE_BIND_OK: u32 = 0x0028_001F;
pub const EXCHANGE_UNBIND: u32 = 0x0028_0028;
pub const EXCHANGE_UNBIND_OK: u32 = 0x0028_0033;

pub const QUEUE_DECLARE: u32 = 0x0032_000A;
pub const QUEUE_DECLARE_OK: u32 = 0x0032_000B;
pub const QUEUE_BIND: u32 = 0x0032_0014;
pub const QUEUE_BIND_OK: u32 = 0x0032_0015;
pub const QUEUE_PURGE: u32 = 0x0032_001E;
pub const QUEUE_PURGE_OK: u32 = 0x0032_001F;
pub const QUEUE_DELETE: u32 = 0x0032_0028;
pub const QUEUE_DELETE_OK: u32 = 0x0032_0029;
pub const QUEUE_UNBIND: u32 = 0x0032_0032;
pub const QUEUE_UNBIND_OK: u32 = 0x0032_0033;

pub const BASIC_QOS: u32 = 0x003C_000A;
pub const BASIC_QOS_OK: u32 = 0x003C_000B;
pub const BASIC_CONSUME: u32 = 0x003C_0014;
pub const BASIC_CONSUME_OK: u32 = 0x003C_0015;
pub const BASIC_CANCEL: u32 = 0x003C_001E;
pub const BASIC_CANCEL_OK: u32 = 0x003C_001F;
pub const BASIC_PUBLISH: u32 = 0x003C_0028;
pub const BASIC_RETURN: u32 = 0x003C_0032;
pub const BASIC_DELIVER: u32 = 0x003C_003C;
pub const BASIC_GET: u32 = 0x003C_0046;
pub const BASIC_GET_OK: u32 = 0x003C_0047;
pub const BASIC_GET_EMPTY: u32 = 0x003C_0048;
pub const BASIC_ACK: u32 = 0x003C_0050;
pub const BASIC_REJECT: u32 = 0x003C_005A;
pub const BASIC_RECOVER: u32 = 0x003C_006E;
pub const BASIC_RECOVER_OK: u32 = 0x003C_006F;
pub const BASIC_NACK: u32 = 0x003C_0078;

pub const CONFIRM_SELECT: u32 = 0x0055_000A;
pub const CONFIRM_SELECT_OK: u32 = 0x0055_000B;

pub const TX_SELECT: u32 = 0x005A_000A;
pub const TX_SELECT_OK: u32 = 0x005A_000B;
pub const TX_COMMIT: u32 = 0x005A_0014;
pub const TX_COMMIT_OK: u32 = 0x005A_0015;
pub const TX_ROLLBACK: u32 = 0x005A_001E;
pub const TX_ROLLBACK_OK: u32 = 0x005A_001F;

pub const REPLY_SUCCESS: u16 = 200;
pub const PRECONDITION_FAILED: u16 = 406;
pub const FRAME_ERROR: u16 = 501;
pub const NOT_ALLOWED: u16 = 530;
pub const UNEXPECTED_FRAME: u16 = 505;
pub const NOT_IMPLEMENTED: u16 = 540;

/// Minimum frame size every AMQP peer must accept.
pub const FRAME_MIN_SIZE: u32 = 4096;

/// Bytes of framing overhead around a content body payload (7 byte header
/// plus the frame-end octet).
pub const FRAME_OVERHEAD: usize = 8;

pub const PROTOCOL_HEADER: &[u8] = b"AMQP\x00\x00\x09\x01";

pub const FRAME_TYPE_METHOD: u8 = 1;
pub const FRAME_TYPE_HEADER: u8 = 2;
pub const FRAME_TYPE_BODY: u8 = 3;
pub const FRAME_TYPE_HEARTBEAT: u8 = 8;
pub const FRAME_END: u8 = 0xCE;

/// A single AMQP frame, tagged with the channel it was sent on.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Method(ChannelId, Method),
    Header(ChannelId, ContentHeader),
    Body(ChannelId, Vec<u8>),
    Heartbeat(ChannelId),
}

/// The content header frame that follows a content-bearing method.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentHeader {
    pub class_id: u16,
    pub body_size: u64,
    pub properties: AmqpProperties,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionStart {
    pub version_major: u8,
    pub version_minor: u8,
    pub server_properties: FieldTable,
    pub mechanisms: String,
    pub locales: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionStartOk {
    pub client_properties: FieldTable,
    pub mechanism: String,
    pub response: String,
    pub locale: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionSecure {
    pub challenge: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionSecureOk {
    pub response: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionTune {
    pub channel_max: u16,
    pub frame_max: u32,
    pub heartbeat: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionTuneOk {
    pub channel_max: u16,
    pub frame_max: u32,
    pub heartbeat: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionOpen {
    pub virtual_host: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionClose {
    pub reply_code: u16,
    pub reply_text: String,
    pub class_id: u16,
    pub method_id: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionBlocked {
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelClose {
    pub reply_code: u16,
    pub reply_text: String,
    pub class_id: u16,
    pub method_id: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeDeclare {
    pub exchange: String,
    pub type_: String,
    pub passive: bool,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub nowait: bool,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeDelete {
    pub exchange: String,
    pub if_unused: bool,
    pub nowait: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeBind {
    pub destination: String,
    pub source: String,
    pub routing_key: String,
    pub nowait: bool,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeUnbind {
    pub destination: String,
    pub source: String,
    pub routing_key: String,
    pub nowait: bool,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeclare {
    pub queue: String,
    pub passive: bool,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    pub nowait: bool,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeclareOk {
    pub queue: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueBind {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    pub nowait: bool,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueUnbind {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueuePurge {
    pub queue: String,
    pub nowait: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueuePurgeOk {
    pub message_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDelete {
    pub queue: String,
    pub if_unused: bool,
    pub if_empty: bool,
    pub nowait: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeleteOk {
    pub message_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicQos {
    pub prefetch_size: u32,
    pub prefetch_count: u16,
    pub global: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicConsume {
    pub queue: String,
    pub consumer_tag: String,
    pub no_local: bool,
    pub no_ack: bool,
    pub exclusive: bool,
    pub nowait: bool,
    pub arguments: FieldTable,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicConsumeOk {
    pub consumer_tag: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicCancel {
    pub consumer_tag: String,
    pub nowait: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicCancelOk {
    pub consumer_tag: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicPublish {
    pub exchange: String,
    pub routing_key: String,
    pub mandatory: bool,
    pub immediate: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicReturn {
    pub reply_code: u16,
    pub reply_text: String,
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicDeliver {
    pub consumer_tag: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicGet {
    pub queue: String,
    pub no_ack: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicGetOk {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
    pub message_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicAck {
    pub delivery_tag: u64,
    pub multiple: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicNack {
    pub delivery_tag: u64,
    pub multiple: bool,
    pub requeue: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicReject {
    pub delivery_tag: u64,
    pub requeue: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicRecover {
    pub requeue: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfirmSelect {
    pub nowait: bool,
}

/// A decoded AMQP method.
#[derive(Clone, Debug, PartialEq)]
pub enum Method {
    ConnectionStart(ConnectionStart),
    ConnectionStartOk(ConnectionStartOk),
    ConnectionSecure(ConnectionSecure),
    ConnectionSecureOk(ConnectionSecureOk),
    ConnectionTune(ConnectionTune),
    ConnectionTuneOk(ConnectionTuneOk),
    ConnectionOpen(ConnectionOpen),
    ConnectionOpenOk,
    ConnectionClose(ConnectionClose),
    ConnectionCloseOk,
    ConnectionBlocked(ConnectionBlocked),
    ConnectionUnblocked,
    ChannelOpen,
    ChannelOpenOk,
    ChannelClose(ChannelClose),
    ChannelCloseOk,
    ExchangeDeclare(ExchangeDeclare),
    ExchangeDeclareOk,
    ExchangeDelete(ExchangeDelete),
    ExchangeDeleteOk,
    ExchangeBind(ExchangeBind),
    ExchangeBindOk,
    ExchangeUnbind(ExchangeUnbind),
    ExchangeUnbindOk,
    QueueDeclare(QueueDeclare),
    QueueDeclareOk(QueueDeclareOk),
    QueueBind(QueueBind),
    QueueBindOk,
    QueueUnbind(QueueUnbind),
    QueueUnbindOk,
    QueuePurge(QueuePurge),
    QueuePurgeOk(QueuePurgeOk),
    QueueDelete(QueueDelete),
    QueueDeleteOk(QueueDeleteOk),
    BasicQos(BasicQos),
    BasicQosOk,
    BasicConsume(BasicConsume),
    BasicConsumeOk(BasicConsumeOk),
    BasicCancel(BasicCancel),
    BasicCancelOk(BasicCancelOk),
    BasicPublish(BasicPublish),
    BasicReturn(BasicReturn),
    BasicDeliver(BasicDeliver),
    BasicGet(BasicGet),
    BasicGetOk(BasicGetOk),
    BasicGetEmpty,
    BasicAck(BasicAck),
    BasicNack(BasicNack),
    BasicReject(BasicReject),
    BasicRecover(BasicRecover),
    BasicRecoverOk,
    ConfirmSelect(ConfirmSelect),
    ConfirmSelectOk,
    TxSelect,
    TxSelectOk,
    TxCommit,
    TxCommitOk,
    TxRollback,
    TxRollbackOk,
}

impl Method {
    /// The packed `(class-id << 16) | method-id` discriminant of this method.
    pub fn class_method(&self) -> ClassMethod {
        match self {
            Method::ConnectionStart(_) => CONNECTION_START,
            Method::ConnectionStartOk(_) => CONNECTION_START_OK,
            Method::ConnectionSecure(_) => CONNECTION_SECURE,
            Method::ConnectionSecureOk(_) => CONNECTION_SECURE_OK,
            Method::ConnectionTune(_) => CONNECTION_TUNE,
            Method::ConnectionTuneOk(_) => CONNECTION_TUNE_OK,
            Method::ConnectionOpen(_) => CONNECTION_OPEN,
            Method::ConnectionOpenOk => CONNECTION_OPEN_OK,
            Method::ConnectionClose(_) => CONNECTION_CLOSE,
            Method::ConnectionCloseOk => CONNECTION_CLOSE_OK,
            Method::ConnectionBlocked(_) => CONNECTION_BLOCKED,
            Method::ConnectionUnblocked => CONNECTION_UNBLOCKED,
            Method::ChannelOpen => CHANNEL_OPEN,
            Method::ChannelOpenOk => CHANNEL_OPEN_OK,
            Method::ChannelClose(_) => CHANNEL_CLOSE,
            Method::ChannelCloseOk => CHANNEL_CLOSE_OK,
            Method::ExchangeDeclare(_) => EXCHANGE_DECLARE,
            Method::ExchangeDeclareOk => EXCHANGE_DECLARE_OK,
            Method::ExchangeDelete(_) => EXCHANGE_DELETE,
            Method::ExchangeDeleteOk => EXCHANGE_DELETE_OK,
            Method::ExchangeBind(_) => EXCHANGE_BIND,
            Method::ExchangeBindOk => EXCHANGE_BIND_OK,
            Method::ExchangeUnbind(_) => EXCHANGE_UNBIND,
            Method::ExchangeUnbindOk => EXCHANGE_UNBIND_OK,
            Method::QueueDeclare(_) => QUEUE_DECLARE,
            Method::QueueDeclareOk(_) => QUEUE_DECLARE_OK,
            Method::QueueBind(_) => QUEUE_BIND,
            Method::QueueBindOk => QUEUE_BIND_OK,
            Method::QueueUnbind(_) => QUEUE_UNBIND,
            Method::QueueUnbindOk => QUEUE_UNBIND_OK,
            Method::QueuePurge(_) => QUEUE_PURGE,
            Method::QueuePurgeOk(_) => QUEUE_PURGE_OK,
            Method::QueueDelete(_) => QUEUE_DELETE,
            Method::QueueDeleteOk(_) => QUEUE_DELETE_OK,
            Method::BasicQos(_) => BASIC_QOS,
            Method::BasicQosOk => BASIC_QOS_OK,
            Method::BasicConsume(_) => BASIC_CONSUME,
            Method::BasicConsumeOk(_) => BASIC_CONSUME_OK,
            Method::BasicCancel(_) => BASIC_CANCEL,
            Method::BasicCancelOk(_) => BASIC_CANCEL_OK,
            Method::BasicPublish(_) => BASIC_PUBLISH,
            Method::BasicReturn(_) => BASIC_RETURN,
            Method::BasicDeliver(_) => BASIC_DELIVER,
            Method::BasicGet(_) => BASIC_GET,
            Method::BasicGetOk(_) => BASIC_GET_OK,
            Method::BasicGetEmpty => BASIC_GET_EMPTY,
            Method::BasicAck(_) => BASIC_ACK,
            Method::BasicNack(_) => BASIC_NACK,
            Method::BasicReject(_) => BASIC_REJECT,
            Method::BasicRecover(_) => BASIC_RECOVER,
            Method::BasicRecoverOk => BASIC_RECOVER_OK,
            Method::ConfirmSelect(_) => CONFIRM_SELECT,
            Method::ConfirmSelectOk => CONFIRM_SELECT_OK,
            Method::TxSelect => TX_SELECT,
            Method::TxSelectOk => TX_SELECT_OK,
            Method::TxCommit => TX_COMMIT,
            Method::TxCommitOk => TX_COMMIT_OK,
            Method::TxRollback => TX_ROLLBACK,
            Method::TxRollbackOk => TX_ROLLBACK_OK,
        }
    }

    #[inline]
    pub fn class_id(&self) -> u16 {
        (self.class_method() >> 16) as u16
    }

    #[inline]
    pub fn method_id(&self) -> u16 {
        self.class_method() as u16
    }

    /// The `class.method` name of this method as spelled in the protocol
    /// specification.
    pub fn name(&self) -> &'static str {
        method_name(self.class_method())
    }
}

/// The `class.method` name for a packed class-method id.
pub fn method_name(class_method: ClassMethod) -> &'static str {
    match class_method {
        CONNECTION_START => "connection.start",
        CONNECTION_START_OK => "connection.start-ok",
        CONNECTION_SECURE => "connection.secure",
        CONNECTION_SECURE_OK => "connection.secure-ok",
        CONNECTION_TUNE => "connection.tune",
        CONNECTION_TUNE_OK => "connection.tune-ok",
        CONNECTION_OPEN => "connection.open",
        CONNECTION_OPEN_OK => "connection.open-ok",
        CONNECTION_CLOSE => "connection.close",
        CONNECTION_CLOSE_OK => "connection.close-ok",
        CONNECTION_BLOCKED => "connection.blocked",
        CONNECTION_UNBLOCKED => "connection.unblocked",
        CHANNEL_OPEN => "channel.open",
        CHANNEL_OPEN_OK => "channel.open-ok",
        CHANNEL_CLOSE => "channel.close",
        CHANNEL_CLOSE_OK => "channel.close-ok",
        EXCHANGE_DECLARE => "exchange.declare",
        EXCHANGE_DECLARE_OK => "exchange.declare-ok",
        EXCHANGE_DELETE => "exchange.delete",
        EXCHANGE_DELETE_OK => "exchange.delete-ok",
        EXCHANGE_BIND => "exchange.bind",
        EXCHANGE_BIND_OK => "exchange.bind-ok",
        EXCHANGE_UNBIND => "exchange.unbind",
        EXCHANGE_UNBIND_OK => "exchange.unbind-ok",
        QUEUE_DECLARE => "queue.declare",
        QUEUE_DECLARE_OK => "queue.declare-ok",
        QUEUE_BIND => "queue.bind",
        QUEUE_BIND_OK => "queue.bind-ok",
        QUEUE_UNBIND => "queue.unbind",
        QUEUE_UNBIND_OK => "queue.unbind-ok",
        QUEUE_PURGE => "queue.purge",
        QUEUE_PURGE_OK => "queue.purge-ok",
        QUEUE_DELETE => "queue.delete",
        QUEUE_DELETE_OK => "queue.delete-ok",
        BASIC_QOS => "basic.qos",
        BASIC_QOS_OK => "basic.qos-ok",
        BASIC_CONSUME => "basic.consume",
        BASIC_CONSUME_OK => "basic.consume-ok",
        BASIC_CANCEL => "basic.cancel",
        BASIC_CANCEL_OK => "basic.cancel-ok",
        BASIC_PUBLISH => "basic.publish",
        BASIC_RETURN => "basic.return",
        BASIC_DELIVER => "basic.deliver",
        BASIC_GET => "basic.get",
        BASIC_GET_OK => "basic.get-ok",
        BASIC_GET_EMPTY => "basic.get-empty",
        BASIC_ACK => "basic.ack",
        BASIC_NACK => "basic.nack",
        BASIC_REJECT => "basic.reject",
        BASIC_RECOVER => "basic.recover",
        BASIC_RECOVER_OK => "basic.recover-ok",
        CONFIRM_SELECT => "confirm.select",
        CONFIRM_SELECT_OK => "confirm.select-ok",
        TX_SELECT => "tx.select",
        TX_SELECT_OK => "tx.select-ok",
        TX_COMMIT => "tx.commit",
        TX_COMMIT_OK => "tx.commit-ok",
        TX_ROLLBACK => "tx.rollback",
        TX_ROLLBACK_OK => "tx.rollback-ok",
        _ => "unknown",
    }
}
