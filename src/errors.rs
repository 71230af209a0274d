use snafu::Snafu;
use std::io;
use std::result;
use std::sync::Arc;

/// A type alias for handling errors throughout warren.
pub type Result<T, E = Error> = result::Result<T, E>;

/// Specific error cases returned by warren.
///
/// Errors are `Clone` because a single close reason may be broadcast to many
/// blocked waiters (synchronous callers, consumers, confirm waiters).
#[derive(Clone, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// URL parsing failed.
    #[snafu(display("could not parse url: {}", source))]
    UrlParse { source: url::ParseError },

    /// URL could not be decoded into an AMQP or AMQPS connection string.
    #[snafu(display("invalid url: {}", url))]
    InvalidUrl { url: String },

    /// An insecure URL was supplied to a method that only allows secure
    /// connections.
    #[snafu(display("insecure URL passed to method that only allows secure connections"))]
    InsecureUrl,

    /// A TLS connection was requested (e.g., via URL), but warren was built
    /// without TLS support.
    #[snafu(display("warren built without TLS support"))]
    TlsFeatureNotEnabled,

    /// The TLS handshake failed.
    #[snafu(display("TLS handshake failed: {}", message))]
    TlsHandshake { message: String },

    /// Failed to open the TCP connection to the server.
    #[snafu(display("failed to connect: {}", source))]
    FailedToConnect {
        #[snafu(source(from(io::Error, Arc::new)))]
        source: Arc<io::Error>,
    },

    /// Timeout occurred while performing the initial connection handshake.
    #[snafu(display("timeout occurred while waiting for connection handshake"))]
    ConnectionTimeout,

    /// An I/O error occurred while reading from the socket.
    #[snafu(display("I/O error reading socket: {}", source))]
    IoErrorReadingSocket {
        #[snafu(source(from(io::Error, Arc::new)))]
        source: Arc<io::Error>,
    },

    /// An I/O error occurred while writing to the socket.
    #[snafu(display("I/O error writing socket: {}", source))]
    IoErrorWritingSocket {
        #[snafu(source(from(io::Error, Arc::new)))]
        source: Arc<io::Error>,
    },

    /// The underlying socket was closed.
    #[snafu(display("underlying socket closed unexpectedly"))]
    UnexpectedSocketClose,

    /// We received data that could not be parsed as an AMQP frame.
    #[snafu(display("received malformed data - expected AMQP frame"))]
    ReceivedMalformed,

    /// We received a valid AMQP frame but not the one we expected; e.g.,
    /// receiving an incorrect response to a synchronous AMQP method call.
    #[snafu(display(
        "AMQP protocol error - expected {} but received {}",
        expected,
        actual
    ))]
    FrameUnexpected {
        expected: &'static str,
        actual: String,
    },

    /// The server does not support the requested auth mechanism.
    #[snafu(display(
        "requested auth mechanism {} unavailable (available = {})",
        requested,
        available
    ))]
    UnsupportedAuthMechanism {
        available: String,
        requested: String,
    },

    /// The server does not support the requested locale.
    #[snafu(display(
        "requested locale {} unavailable (available = {})",
        requested,
        available
    ))]
    UnsupportedLocale {
        available: String,
        requested: String,
    },

    /// The requested frame size is smaller than the minimum required by AMQP.
    #[snafu(display("requested frame max {} is too small (min = {})", requested, min))]
    FrameMaxTooSmall { min: u32, requested: u32 },

    /// The server requested a Secure/Secure-Ok exchange, which are currently
    /// unsupported.
    #[snafu(display("SASL secure/secure-ok exchanges are not supported"))]
    SaslSecureNotSupported,

    /// The supplied authentication credentials were not accepted by the server.
    #[snafu(display("invalid credentials"))]
    InvalidCredentials,

    /// The server missed too many successive heartbeats.
    #[snafu(display("missed heartbeats from server"))]
    MissedServerHeartbeats,

    /// The server closed the connection with the given reply code and text.
    #[snafu(display("server closed connection (code={} message={})", code, message))]
    ServerClosedConnection {
        code: u16,
        message: String,
        class_id: u16,
        method_id: u16,
    },

    /// The client closed the connection.
    #[snafu(display("client closed connection"))]
    ClientClosedConnection,

    /// The server closed the given channel with the given reply code and text.
    #[snafu(display(
        "server closed channel {} (code={}, message={})",
        channel_id,
        code,
        message
    ))]
    ServerClosedChannel {
        channel_id: u16,
        code: u16,
        message: String,
        class_id: u16,
        method_id: u16,
    },

    /// The client closed the channel.
    #[snafu(display("channel {} has been closed", channel_id))]
    ClientClosedChannel { channel_id: u16 },

    /// No more channels can be opened because there are already `channel_max`
    /// channels open.
    #[snafu(display("no more channel ids are available"))]
    ExhaustedChannelIds,

    /// An explicit channel ID was requested, but that channel is unavailable
    /// for use (e.g., because there is another open channel with the same ID).
    #[snafu(display("requested channel id {} is unavailable", channel_id))]
    UnavailableChannelId { channel_id: u16 },

    /// The server sent frames for a channel ID we don't know about.
    #[snafu(display("received frame for nonexistent channel {}", channel_id))]
    ReceivedFrameWithBogusChannelId { channel_id: u16 },

    /// The server sent us a consumer tag that is equal to another consumer tag
    /// we already have on the same channel.
    #[snafu(display(
        "server sent duplicate consumer tag for channel {}: {}",
        channel_id,
        consumer_tag
    ))]
    DuplicateConsumerTag {
        channel_id: u16,
        consumer_tag: String,
    },

    /// The client sent an AMQP exception to the server and closed the
    /// connection.
    #[snafu(display("internal client exception - received unhandled frames from server"))]
    ClientException,

    /// Forking the connection reader thread failed.
    #[snafu(display("fork failed: {}", source))]
    ForkFailed {
        #[snafu(source(from(io::Error, Arc::new)))]
        source: Arc<io::Error>,
    },

    /// The connection reader thread panicked.
    #[snafu(display("reader thread panicked"))]
    ReaderThreadPanic,

    /// A short string field exceeded the 255 byte limit of the wire encoding.
    #[snafu(display("string of length {} too long for short string (max 255)", length))]
    ShortStringTooLong { length: usize },
}
