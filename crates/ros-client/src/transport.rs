//! Socket setup: TCP connect, keepalive tuning, optional TLS.
//!
//! The [`Connector`] trait is the seam between the connection manager and
//! the network, so sessions can run over any `Read + Write` stream.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tracing::{debug, trace};

use crate::config::{ClientConfig, KeepaliveConfig};
use crate::error::ClientResult;
use crate::tls::TlsStream;

/// Opens byte streams to the appliance.
pub trait Connector {
    /// The stream a session runs over.
    type Stream: Read + Write;

    /// Opens a new stream, ready for the login exchange.
    fn connect(&self, config: &ClientConfig) -> ClientResult<Self::Stream>;

    /// Called once the login exchange has succeeded.
    fn authenticated(&self, _stream: &mut Self::Stream, _config: &ClientConfig) -> ClientResult<()> {
        Ok(())
    }

    /// Releases a stream that is no longer needed.
    fn disconnect(&self, stream: Self::Stream) {
        drop(stream);
    }
}

/// A plaintext or TLS-wrapped TCP stream.
#[derive(Debug)]
pub enum Transport {
    /// Plain TCP.
    Plain(TcpStream),
    /// TLS over TCP.
    Tls(Box<TlsStream>),
}

impl Transport {
    /// Returns the underlying TCP socket.
    pub fn socket(&self) -> &TcpStream {
        match self {
            Transport::Plain(socket) => socket,
            Transport::Tls(tls) => tls.get_ref(),
        }
    }

    /// Returns true if the stream is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Sets the socket read and write timeouts.
    pub fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> io::Result<()> {
        let socket = self.socket();
        socket.set_read_timeout(read)?;
        socket.set_write_timeout(write)
    }

    /// Sends a TLS close notification if applicable and shuts the socket down.
    pub fn shutdown(mut self) {
        if let Transport::Tls(tls) = &mut self {
            tls.conn.send_close_notify();
            let _ = tls.flush();
        }
        let _ = self.socket().shutdown(Shutdown::Both);
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(socket) => socket.read(buf),
            Transport::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(socket) => socket.write(buf),
            Transport::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(socket) => socket.flush(),
            Transport::Tls(tls) => tls.flush(),
        }
    }
}

/// Connects over TCP, with TLS when the configuration asks for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = Transport;

    fn connect(&self, config: &ClientConfig) -> ClientResult<Transport> {
        let port = config.port();
        let socket = open_socket(&config.host, port, config.connect_timeout)?;

        // Reads and writes during login are bounded by the connect timeout.
        socket.set_read_timeout(Some(config.connect_timeout))?;
        socket.set_write_timeout(Some(config.connect_timeout))?;
        socket.set_nodelay(true)?;
        set_keepalive(&socket, &config.keepalive)?;

        let transport = match &config.tls {
            Some(tls) => Transport::Tls(Box::new(tls.wrap(socket, &config.host)?)),
            None => Transport::Plain(socket),
        };

        debug!(host = %config.host, port, tls = transport.is_tls(), "connected");
        Ok(transport)
    }

    fn authenticated(&self, stream: &mut Transport, config: &ClientConfig) -> ClientResult<()> {
        stream.set_timeouts(config.read_timeout, config.write_timeout)?;
        Ok(())
    }

    fn disconnect(&self, stream: Transport) {
        stream.shutdown();
    }
}

/// Resolves `host` and connects to the first address that answers.
fn open_socket(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;

    for addr in (host, port).to_socket_addrs()? {
        trace!(%addr, "trying address");
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(socket) => return Ok(socket),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}:{port}"),
        )
    }))
}

/// Enables TCP keepalive with the configured idle time, interval and probe
/// count (where the platform supports setting them).
pub fn set_keepalive(socket: &TcpStream, config: &KeepaliveConfig) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(config.idle);

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
    ))]
    let keepalive = keepalive
        .with_interval(config.interval)
        .with_retries(config.retries);

    SockRef::from(socket).set_tcp_keepalive(&keepalive)
}
