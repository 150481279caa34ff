//! Datagram transports.
//!
//! `UdpTransport` talks to a real server. `ChannelTransport` connects the
//! agent to an in-process peer over crossbeam channels, and
//! `LossyTransport` wraps either to drop outbound datagrams at random.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Largest datagram the server sends.
const MAX_DATAGRAM: usize = 8192;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not resolve server address {0}")]
    Resolve(String),
    #[error("Peer disconnected")]
    Disconnected,
}

pub trait Transport: Send + Sync {
    fn send(&self, payload: &str) -> Result<(), TransportError>;

    /// Waits up to `timeout` for one datagram. `Ok(None)` on timeout or
    /// when the datagram was discarded.
    fn recv(&self, timeout: Duration) -> Result<Option<String>, TransportError>;
}

pub struct UdpTransport {
    socket: UdpSocket,
    /// Host the agent connected to; datagrams from anywhere else are dropped.
    server_ip: IpAddr,
    peer: Mutex<Peer>,
}

struct Peer {
    addr: SocketAddr,
    /// Set once the per-player port has replaced the connect port.
    retargeted: bool,
}

impl UdpTransport {
    /// Binds an ephemeral local port aimed at `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let peer = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Resolve(format!("{}:{}", host, port)))?;
        let bind: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0u8; 4], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)?;
        debug!(local = %socket.local_addr()?, %peer, "UDP socket bound");
        Ok(Self {
            socket,
            server_ip: peer.ip(),
            peer: Mutex::new(Peer {
                addr: peer,
                retargeted: false,
            }),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer.lock().addr
    }

    /// Whether a datagram from `from` is the server talking. The first reply
    /// from a new port on the server host moves the peer there; after that
    /// only the current peer is accepted.
    fn accept_source(&self, from: SocketAddr) -> bool {
        if from.ip() != self.server_ip {
            debug!(%from, "Dropped datagram from foreign host");
            return false;
        }
        let mut peer = self.peer.lock();
        if peer.addr == from {
            return true;
        }
        if peer.retargeted {
            debug!(%from, peer = %peer.addr, "Dropped datagram from stale port");
            return false;
        }
        info!(old = %peer.addr, new = %from, "Server peer address changed");
        peer.addr = from;
        peer.retargeted = true;
        true
    }
}

impl Transport for UdpTransport {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        let peer = self.peer();
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.extend_from_slice(payload.as_bytes());
        bytes.push(0);
        self.socket.send_to(&bytes, peer)?;
        Ok(())
    }

    /// The server answers `init` from a per-player port; later sends go there.
    fn recv(&self, timeout: Duration) -> Result<Option<String>, TransportError> {
        self.socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                if !self.accept_source(from) {
                    return Ok(None);
                }
                let text = String::from_utf8_lossy(&buf[..len])
                    .trim_end_matches('\0')
                    .to_string();
                Ok(Some(text))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process transport. The agent holds this end.
pub struct ChannelTransport {
    outbound: Sender<String>,
    inbound: Receiver<String>,
}

/// The other end of a [`ChannelTransport`], standing in for the server.
pub struct ChannelPeer {
    to_agent: Sender<String>,
    from_agent: Receiver<String>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (to_agent, inbound) = channel::unbounded();
        let (outbound, from_agent) = channel::unbounded();
        (
            ChannelTransport { outbound, inbound },
            ChannelPeer {
                to_agent,
                from_agent,
            },
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        self.outbound
            .send(payload.to_string())
            .map_err(|_| TransportError::Disconnected)
    }

    fn recv(&self, timeout: Duration) -> Result<Option<String>, TransportError> {
        match self.inbound.recv_timeout(timeout) {
            Ok(text) => Ok(Some(text)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

impl ChannelPeer {
    /// Delivers a server message to the agent.
    pub fn push(&self, message: impl Into<String>) -> Result<(), TransportError> {
        self.to_agent
            .send(message.into())
            .map_err(|_| TransportError::Disconnected)
    }

    /// Next datagram the agent sent.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.from_agent.recv_timeout(timeout).ok()
    }

    /// Everything the agent sent so far.
    pub fn drain(&self) -> Vec<String> {
        self.from_agent.try_iter().collect()
    }
}

/// Drops outbound datagrams with a fixed probability.
pub struct LossyTransport<T> {
    inner: T,
    drop_probability: f64,
    rng: Mutex<SmallRng>,
    dropped: AtomicU64,
}

impl<T: Transport> LossyTransport<T> {
    pub fn new(inner: T, drop_probability: f64, seed: u64) -> Self {
        Self {
            inner,
            drop_probability: drop_probability.clamp(0.0, 1.0),
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for LossyTransport<T> {
    fn send(&self, payload: &str) -> Result<(), TransportError> {
        let roll: f64 = self.rng.lock().gen();
        if roll < self.drop_probability {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(payload, "Dropping outbound datagram");
            return Ok(());
        }
        self.inner.send(payload)
    }

    fn recv(&self, timeout: Duration) -> Result<Option<String>, TransportError> {
        self.inner.recv(timeout)
    }
}
