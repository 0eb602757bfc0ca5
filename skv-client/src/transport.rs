//! # Transport Seam
//!
//! Purpose: Separate "how to dial the store" from "what a session does with
//! the connection", so sessions can redial on their own and tests can swap in
//! scripted transports.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `Connector` dials, `Transport` exchanges one
//!    request/response pair.
//! 2. **Buffer Reuse**: `TcpTransport` keeps its line and write buffers across
//!    calls.

use std::io::{self, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{ClientError, ClientResult};
use crate::resp::{encode_command, read_response, RespValue};

/// One established connection to the store.
pub trait Transport: Send {
    /// Sends one command and reads its reply.
    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue>;
}

/// Dials fresh transports to one store address.
pub trait Connector: Send + Sync {
    /// Address in `host:port` form, used for logging.
    fn addr(&self) -> &str;

    /// Opens a new transport.
    fn connect(&self) -> ClientResult<Box<dyn Transport>>;
}

/// Dials plain TCP connections.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpConnector {
    /// Creates a connector for `host:port` without timeouts.
    pub fn new(host: &str, port: u16) -> Self {
        TcpConnector {
            addr: format!("{}:{}", host, port),
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Sets connect, read and write timeouts.
    pub fn with_timeouts(
        mut self,
        connect: Option<Duration>,
        read: Option<Duration>,
        write: Option<Duration>,
    ) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    fn dial(&self) -> ClientResult<TcpStream> {
        let stream = match self.connect_timeout {
            Some(timeout) => self.dial_resolved(timeout)?,
            None => TcpStream::connect(self.addr.as_str()).map_err(|source| self.connect_err(source))?,
        };
        self.tune(&stream).map_err(|source| self.connect_err(source))?;
        Ok(stream)
    }

    /// Resolves the host and tries each address in turn; `connect_timeout`
    /// only takes socket addresses.
    fn dial_resolved(&self, timeout: Duration) -> ClientResult<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|_| ClientError::InvalidAddress(self.addr.clone()))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        match last_err {
            Some(source) => Err(self.connect_err(source)),
            None => Err(ClientError::InvalidAddress(self.addr.clone())),
        }
    }

    fn tune(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)
    }

    fn connect_err(&self, source: io::Error) -> ClientError {
        ClientError::Connect {
            addr: self.addr.clone(),
            source,
        }
    }
}

impl Connector for TcpConnector {
    fn addr(&self) -> &str {
        &self.addr
    }

    fn connect(&self) -> ClientResult<Box<dyn Transport>> {
        let stream = self.dial()?;
        Ok(Box::new(TcpTransport {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        }))
    }
}

/// Single TCP connection with reusable buffers.
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Transport for TcpTransport {
    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Read};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn tcp_transport_exchanges_command() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            assert_eq!(header, "*1\r\n");
            let mut rest = [0u8; 10];
            reader.read_exact(&mut rest).unwrap();
            assert_eq!(&rest, b"$4\r\nPING\r\n");
            stream.write_all(b"+PONG\r\n").unwrap();
        });

        let connector = TcpConnector::new("127.0.0.1", port).with_timeouts(
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(1)),
        );
        let mut transport = connector.connect().unwrap();
        let reply = transport.exec(&[b"PING"]).unwrap();
        assert_eq!(reply, RespValue::Simple(b"PONG".to_vec()));
        server.join().unwrap();
    }

    #[test]
    fn refused_dial_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpConnector::new("127.0.0.1", port).connect().err().unwrap();
        assert!(matches!(err, ClientError::Connect { .. }));
    }

    #[test]
    fn timed_dial_resolves_host_names() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut frame = [0u8; 14];
            reader.read_exact(&mut frame).unwrap();
            stream.write_all(b"+PONG\r\n").unwrap();
        });

        let connector = TcpConnector::new("localhost", port).with_timeouts(
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(1)),
            None,
        );
        let mut transport = connector.connect().unwrap();
        let reply = transport.exec(&[b"PING"]).unwrap();
        assert_eq!(reply, RespValue::Simple(b"PONG".to_vec()));
        server.join().unwrap();
    }

    #[test]
    fn unresolvable_host_is_invalid_address() {
        let connector = TcpConnector::new("no-such-host.invalid", 6379)
            .with_timeouts(Some(Duration::from_millis(200)), None, None);
        let err = connector.connect().err().unwrap();
        assert!(matches!(err, ClientError::InvalidAddress(ref addr) if addr == "no-such-host.invalid:6379"));
    }
}
