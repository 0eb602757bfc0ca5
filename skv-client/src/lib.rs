//! # ScriptKV Client
//!
//! Purpose: Keep a fixed number of persistent, self-healing connections to a
//! Redis-compatible store and hand them out one caller at a time.
//!
//! ## Design Principles
//! 1. **Broker Pattern**: A single thread owns pool membership; acquire and
//!    release are message handoffs, not lock sections.
//! 2. **Self-Healing Sessions**: A dropped transport is redialed and the
//!    command resent, a bounded number of times.
//! 3. **Strategy Seam**: `Connector`/`Transport` separate dialing from use.
//! 4. **Protocol Clarity**: RESP2 is encoded and parsed explicitly.

mod error;
mod pool;
mod resp;
mod session;
mod transport;

pub use error::{ClientError, ClientResult};
pub use pool::{ConnectionPool, PoolConfig, PooledSession, DEFAULT_ACQUIRE_RETRY};
pub use resp::{encode_command, read_response, RespValue};
pub use session::{Session, MAX_SEND_ATTEMPTS};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
