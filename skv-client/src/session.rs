//! # Store Session
//!
//! Purpose: One persistent connection to the store that heals itself when the
//! transport drops.
//!
//! ## Fault Handling
//! A disconnect while sending closes the transport, redials, and resends, up
//! to `MAX_SEND_ATTEMPTS` times per command. Anything else (including store
//! error replies) is returned as-is. When the attempts run out the last
//! failing result goes back to the caller and the session stays usable.
//!
//! ```text
//! Disconnected --dial--> Connected --fault--> Disconnected --redial--> Connected
//!                                      \--fault, attempts exhausted--> Connected + error returned
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;
use crate::transport::{Connector, Transport};

/// Attempts per logical command before giving up on a dropped transport.
pub const MAX_SEND_ATTEMPTS: usize = 3;

/// A single persistent connection, owned by exactly one holder at a time.
pub struct Session {
    id: usize,
    connector: Arc<dyn Connector>,
    conn: Option<Box<dyn Transport>>,
    reconnects: u64,
}

impl Session {
    /// Dials the store once and returns a connected session.
    pub fn open(id: usize, connector: Arc<dyn Connector>) -> ClientResult<Self> {
        let conn = connector.connect()?;
        Ok(Session {
            id,
            connector,
            conn: Some(conn),
            reconnects: 0,
        })
    }

    /// Position of this session inside its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Store address this session dials.
    pub fn addr(&self) -> &str {
        self.connector.addr()
    }

    /// Returns true while a transport is attached.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Number of successful redials since the session was opened.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Sends `command args...`, redialing on transport drops.
    pub fn send_command(&mut self, command: &[u8], args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut frame: Vec<&[u8]> = Vec::with_capacity(args.len() + 1);
        frame.push(command);
        frame.extend_from_slice(args);

        let mut result = Err(ClientError::Disconnected);
        for _ in 0..MAX_SEND_ATTEMPTS {
            result = match self.conn.as_mut() {
                Some(conn) => conn.exec(&frame),
                None => Err(ClientError::Disconnected),
            };
            match &result {
                Err(err) if err.is_disconnect() => {
                    error!(addr = %self.addr(), session = self.id, "store disconnect, {}", err);
                    self.close();
                    self.reconnect();
                }
                _ => break,
            }
        }
        result
    }

    /// Drops the transport, closing the socket.
    pub fn close(&mut self) {
        self.conn = None;
    }

    fn reconnect(&mut self) {
        match self.connector.connect() {
            Ok(conn) => {
                self.conn = Some(conn);
                self.reconnects += 1;
            }
            Err(err) => warn!(addr = %self.addr(), session = self.id, "reconnect failed, {}", err),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("addr", &self.addr())
            .field("connected", &self.is_connected())
            .field("reconnects", &self.reconnects)
            .finish()
    }
}
