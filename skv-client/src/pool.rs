//! # Connection Pool
//!
//! Purpose: Share a fixed set of sessions among many callers without locking
//! pool state.
//!
//! ## Design Principles
//! 1. **Broker Thread**: One thread owns the free queue and is its only
//!    mutator. Callers talk to it over two channels.
//! 2. **Offer, Don't Queue**: The broker keeps offering the queue head on a
//!    rendezvous channel, or "none" when the queue is empty, so it never
//!    blocks waiting for a return. A caller handed "none" sleeps briefly and
//!    asks again. Waiters are therefore not served in FIFO order.
//! 3. **Fail Fast on Init**: Every session is dialed up front; one failure
//!    aborts the whole pool.
//!
//! ```text
//! acquire() <--supply: Option<Session>-- broker[free: VecDeque<Session>] <--returns: Session-- release()
//! ```

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Select, Sender};
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use crate::transport::{Connector, TcpConnector};

/// Default pause before asking the broker again.
pub const DEFAULT_ACQUIRE_RETRY: Duration = Duration::from_millis(30);

/// Pool configuration for one store endpoint.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Store host name or IP.
    pub host: String,
    /// Store port.
    pub port: u16,
    /// Number of sessions, all dialed at init.
    pub capacity: usize,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Pause between acquire attempts while every session is checked out.
    pub acquire_retry_interval: Duration,
}

impl PoolConfig {
    /// Config for `host:port` with `capacity` sessions and no timeouts.
    pub fn new(host: impl Into<String>, port: u16, capacity: usize) -> Self {
        PoolConfig {
            host: host.into(),
            port,
            capacity,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            acquire_retry_interval: DEFAULT_ACQUIRE_RETRY,
        }
    }
}

/// Shared handle to a running pool.
#[derive(Clone, Debug)]
pub struct ConnectionPool {
    addr: Arc<str>,
    capacity: usize,
    retry_interval: Duration,
    supply: Receiver<Option<Session>>,
    returns: Sender<Session>,
}

impl ConnectionPool {
    /// Dials every session over TCP and starts the broker.
    pub fn init(config: PoolConfig) -> ClientResult<Self> {
        let connector = TcpConnector::new(&config.host, config.port).with_timeouts(
            config.connect_timeout,
            config.read_timeout,
            config.write_timeout,
        );
        Self::with_connector(config.capacity, Arc::new(connector), config.acquire_retry_interval)
    }

    /// Dials `capacity` sessions through `connector` and starts the broker.
    ///
    /// Sessions are opened in order; the first failure is returned and the
    /// sessions opened so far are closed.
    pub fn with_connector(
        capacity: usize,
        connector: Arc<dyn Connector>,
        retry_interval: Duration,
    ) -> ClientResult<Self> {
        if capacity == 0 {
            return Err(ClientError::InvalidCapacity);
        }

        let mut free = VecDeque::with_capacity(capacity);
        for id in 0..capacity {
            let session = Session::open(id, connector.clone())?;
            info!("[{}]connect store server {}", id + 1, session.addr());
            free.push_back(session);
        }

        let (supply_tx, supply_rx) = bounded(0);
        let (return_tx, return_rx) = unbounded();
        let addr: Arc<str> = Arc::from(connector.addr());
        let thread_name = format!("skv-pool-{}", addr);
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || run_broker(free, supply_tx, return_rx))?;
        info!(addr = %addr, "connection pool ready, number of pool is {}", capacity);

        Ok(ConnectionPool {
            addr,
            capacity,
            retry_interval,
            supply: supply_rx,
            returns: return_tx,
        })
    }

    /// Store address served by this pool.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Number of sessions owned by the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks until a session is exclusively available.
    pub fn acquire(&self) -> ClientResult<PooledSession> {
        loop {
            match self.supply.recv() {
                Ok(Some(session)) => {
                    return Ok(PooledSession {
                        session: Some(session),
                        returns: self.returns.clone(),
                    })
                }
                Ok(None) => {
                    thread::sleep(self.retry_interval);
                    warn!(addr = %self.addr, "wait for get session, {:?}", self.retry_interval);
                }
                Err(_) => return Err(ClientError::PoolClosed),
            }
        }
    }

    /// Hands a session back to the broker.
    pub fn release(&self, session: PooledSession) {
        session.release();
    }
}

/// Broker loop: the only code that touches the free queue.
fn run_broker(
    mut free: VecDeque<Session>,
    supply: Sender<Option<Session>>,
    returns: Receiver<Session>,
) {
    loop {
        let mut sel = Select::new();
        let offer = sel.send(&supply);
        let take_back = sel.recv(&returns);
        let oper = sel.select();

        if oper.index() == offer {
            let head = free.pop_front();
            if let Err(rejected) = oper.send(&supply, head) {
                // Every pool handle is gone; nobody can acquire again.
                free.extend(rejected.into_inner());
                break;
            }
        } else if oper.index() == take_back {
            match oper.recv(&returns) {
                Ok(session) => free.push_back(session),
                Err(_) => break,
            }
        }
    }

    // Sessions still checked out hold a return sender, so draining here
    // collects the stragglers released while the handles were dropping.
    free.extend(returns.try_iter());
    debug!(idle = free.len(), "pool broker stopped, closing sessions");
}

/// Session checked out of a pool; goes back to the broker on release or drop.
#[derive(Debug)]
pub struct PooledSession {
    session: Option<Session>,
    returns: Sender<Session>,
}

impl PooledSession {
    /// Returns the session to its pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session.as_ref().expect("session present until drop")
    }
}

impl DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("session present until drop")
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if self.returns.send(session).is_err() {
                error!("release session after pool shutdown");
            }
        }
    }
}
