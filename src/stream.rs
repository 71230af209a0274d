use crate::errors::*;
use snafu::ResultExt;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A bidirectional byte stream a connection can run over.
///
/// The connection splits the stream after the handshake: the reader thread
/// owns the read half, and the write half goes behind the connection's write
/// lock.
pub trait IoStream: Read + Write + Send + Sized + 'static {
    type ReadHalf: StreamReadHalf;
    type WriteHalf: Write + Send + 'static;

    fn split(self) -> Result<(Self::ReadHalf, Self::WriteHalf)>;

    /// Sets the read timeout used while this stream is still whole (i.e.,
    /// during the connection handshake).
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

/// The read half of a split [`IoStream`], owned by the connection reader.
pub trait StreamReadHalf: Read + Send + 'static {
    /// Sets the socket read timeout. The reader uses a timeout of a fraction
    /// of the heartbeat interval so it can wake up to send heartbeats and
    /// notice dead peers.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

impl IoStream for TcpStream {
    type ReadHalf = TcpStream;
    type WriteHalf = TcpStream;

    fn split(self) -> Result<(TcpStream, TcpStream)> {
        let write_half = self.try_clone().context(FailedToConnectSnafu)?;
        Ok((self, write_half))
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        TcpStream::set_read_timeout(self, timeout).context(FailedToConnectSnafu)
    }
}

impl StreamReadHalf for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        TcpStream::set_read_timeout(self, timeout).context(FailedToConnectSnafu)
    }
}

/// Opens a TCP connection with `TCP_NODELAY` set, honoring an optional
/// connect timeout.
pub(crate) fn connect_tcp(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<TcpStream> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .context(FailedToConnectSnafu)?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true).context(FailedToConnectSnafu)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err).context(FailedToConnectSnafu),
        None => InvalidUrlSnafu {
            url: format!("{}:{}", host, port),
        }
        .fail(),
    }
}

#[cfg(feature = "native-tls")]
pub use self::tls::TlsStream;

#[cfg(feature = "native-tls")]
mod tls {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// A TLS stream whose two halves share the underlying session behind a
    /// mutex. The reader's socket read timeout bounds how long the lock is
    /// held across a blocking read, so writers are delayed at most one
    /// timeout interval.
    pub struct TlsStream {
        inner: Arc<Mutex<native_tls::TlsStream<TcpStream>>>,
        tcp: TcpStream,
    }

    impl TlsStream {
        /// Runs the TLS handshake over `stream`, verifying the peer
        /// certificate against `domain` unless `verify` is false.
        pub fn connect(domain: &str, stream: TcpStream, verify: bool) -> Result<TlsStream> {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(!verify)
                .danger_accept_invalid_hostnames(!verify)
                .build()
                .map_err(|err| Error::TlsHandshake {
                    message: err.to_string(),
                })?;
            let tcp = stream.try_clone().context(FailedToConnectSnafu)?;
            let tls = connector
                .connect(domain, stream)
                .map_err(|err| Error::TlsHandshake {
                    message: err.to_string(),
                })?;
            Ok(TlsStream {
                inner: Arc::new(Mutex::new(tls)),
                tcp,
            })
        }
    }

    impl Read for TlsStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.lock().unwrap().read(buf)
        }
    }

    impl Write for TlsStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.lock().unwrap().flush()
        }
    }

    impl IoStream for TlsStream {
        type ReadHalf = TlsReadHalf;
        type WriteHalf = TlsWriteHalf;

        fn split(self) -> Result<(TlsReadHalf, TlsWriteHalf)> {
            let write_half = TlsWriteHalf {
                inner: Arc::clone(&self.inner),
            };
            let read_half = TlsReadHalf {
                inner: self.inner,
                tcp: self.tcp,
            };
            Ok((read_half, write_half))
        }

        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
            self.tcp
                .set_read_timeout(timeout)
                .context(FailedToConnectSnafu)
        }
    }

    pub struct TlsReadHalf {
        inner: Arc<Mutex<native_tls::TlsStream<TcpStream>>>,
        tcp: TcpStream,
    }

    impl Read for TlsReadHalf {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.lock().unwrap().read(buf)
        }
    }

    impl StreamReadHalf for TlsReadHalf {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
            self.tcp
                .set_read_timeout(timeout)
                .context(FailedToConnectSnafu)
        }
    }

    pub struct TlsWriteHalf {
        inner: Arc<Mutex<native_tls::TlsStream<TcpStream>>>,
    }

    impl Write for TlsWriteHalf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.lock().unwrap().flush()
        }
    }
}
