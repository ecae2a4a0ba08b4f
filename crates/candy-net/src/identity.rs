//! # Transport Identity
//!
//! Mutually trusted channels. Both ends present a certificate signed by the
//! shared authority and verify the other's before a single application byte
//! moves.
//!
//! ## Channel Establishment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Mutual TLS Establishment                             │
//! │                                                                         │
//! │  CLIENT                                        SERVER                   │
//! │  establish_client_channel()                    accept_connections()     │
//! │     │                                             │                     │
//! │     │── TCP connect ──────────────────────────►  accept loop            │
//! │     │   refused / timed out → Unreachable         │  spawn per conn     │
//! │     │                                             ▼                     │
//! │     │◄════════════ TLS 1.2 handshake ══════════► handshake task         │
//! │     │   server cert → authority + host name       │  client cert        │
//! │     │                                             │  REQUIRED           │
//! │     │   any failure → UntrustedPeer               │  failure → warn!,   │
//! │     │                                             │  drop, no Channel   │
//! │     ▼                                             ▼                     │
//! │  ClientChannel                                 Incoming yields          │
//! │                                                ServerChannel            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handshakes run in their own tasks, so a peer that stalls mid-handshake
//! holds up nobody but itself, and only until the handshake timeout.

use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use rustls::pki_types::ServerName;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use url::{Host, Url};

use crate::credentials::CredentialSet;
use crate::error::{TransportError, TransportResult, TrustError};

// =============================================================================
// Constants
// =============================================================================

/// Default bound on TCP connect plus TLS handshake for the client.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Channels waiting for the server to pick them up.
const PENDING_CHANNELS: usize = 64;

/// Pause after a failed `accept()` (e.g. out of file descriptors).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

// =============================================================================
// Channel
// =============================================================================

/// An established, mutually authenticated TLS stream plus the peer's socket
/// address. The peer closing its side shows up as EOF on `stream`.
#[derive(Debug)]
pub struct Channel<S> {
    stream: S,
    peer: SocketAddr,
}

/// Channel accepted by the server.
pub type ServerChannel = Channel<tokio_rustls::server::TlsStream<TcpStream>>;

/// Channel dialed by the client.
pub type ClientChannel = Channel<tokio_rustls::client::TlsStream<TcpStream>>;

impl<S> Channel<S> {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}

// =============================================================================
// Server Address
// =============================================================================

/// A parsed `host:port` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    host: String,
    port: u16,
    server_name: ServerName<'static>,
}

impl ServerAddress {
    /// Parses `host:port`. The host may be a DNS name, an IPv4 literal, or a
    /// bracketed IPv6 literal; the port is required.
    ///
    /// ## Example
    /// ```rust
    /// use candy_net::identity::ServerAddress;
    ///
    /// let addr = ServerAddress::parse("localhost:8443").unwrap();
    /// assert_eq!(addr.authority(), "localhost:8443");
    ///
    /// assert!(ServerAddress::parse("localhost").is_err());
    /// ```
    pub fn parse(address: &str) -> Result<Self, TrustError> {
        let address = address.trim();
        let invalid = |reason: &str| TrustError::InvalidServerName(format!("{}: {}", address, reason));

        let url = Url::parse(&format!("https://{}", address)).map_err(|e| invalid(&e.to_string()))?;
        if url.path() != "/" || url.query().is_some() || !url.username().is_empty() {
            return Err(invalid("expected host:port"));
        }

        // `Url` drops a port equal to the scheme default
        let port = match url.port() {
            Some(port) => port,
            None if address.ends_with(":443") => 443,
            None => return Err(invalid("missing port")),
        };

        let (host, server_name) = match url.host() {
            Some(Host::Domain(domain)) => {
                let name = ServerName::try_from(domain.to_string())
                    .map_err(|e| invalid(&e.to_string()))?;
                (domain.to_string(), name)
            }
            Some(Host::Ipv4(ip)) => (ip.to_string(), ServerName::from(IpAddr::V4(ip))),
            Some(Host::Ipv6(ip)) => (format!("[{}]", ip), ServerName::from(IpAddr::V6(ip))),
            None => return Err(invalid("missing host")),
        };

        Ok(ServerAddress {
            host,
            port,
            server_name,
        })
    }

    /// Returns `host:port` suitable for a TCP connect.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Name the server certificate must match.
    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }
}

// =============================================================================
// Client Side
// =============================================================================

/// Dials `server_address` and completes a mutual TLS handshake with the
/// default timeout.
pub async fn establish_client_channel(
    credentials: &CredentialSet,
    server_address: &str,
) -> Result<ClientChannel, TrustError> {
    establish_client_channel_with_timeout(credentials, server_address, DEFAULT_CONNECT_TIMEOUT)
        .await
}

/// Dials `server_address` and completes a mutual TLS handshake.
///
/// `connect_timeout` bounds the TCP connect and the handshake separately.
pub async fn establish_client_channel_with_timeout(
    credentials: &CredentialSet,
    server_address: &str,
    connect_timeout: Duration,
) -> Result<ClientChannel, TrustError> {
    let address = ServerAddress::parse(server_address)?;
    let authority = address.authority();

    let tcp = match timeout(connect_timeout, TcpStream::connect(&authority)).await {
        Ok(Ok(tcp)) => tcp,
        Ok(Err(e)) => return Err(TrustError::Unreachable(format!("{}: {}", authority, e))),
        Err(_) => {
            return Err(TrustError::Unreachable(format!(
                "{}: connect timed out after {}s",
                authority,
                connect_timeout.as_secs()
            )))
        }
    };
    let peer = tcp
        .peer_addr()
        .map_err(|e| TrustError::Unreachable(format!("{}: {}", authority, e)))?;

    debug!(peer = %peer, "TCP connected, starting TLS handshake");

    let connector = TlsConnector::from(credentials.client_config());
    let handshake = connector.connect(address.server_name().clone(), tcp);
    let stream = match timeout(connect_timeout, handshake).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(TrustError::UntrustedPeer(e.to_string())),
        Err(_) => {
            return Err(TrustError::Unreachable(format!(
                "{}: TLS handshake timed out after {}s",
                authority,
                connect_timeout.as_secs()
            )))
        }
    };

    debug!(peer = %peer, "Mutual TLS channel established");
    Ok(Channel { stream, peer })
}

// =============================================================================
// Server Side
// =============================================================================

/// Stream of accepted, mutually authenticated channels.
///
/// Dropping it stops the accept loop; handshakes already in flight finish
/// on their own and their channels are discarded.
pub struct Incoming {
    channels: ReceiverStream<ServerChannel>,
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl Incoming {
    /// Address the listener is actually bound to (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Stream for Incoming {
    type Item = ServerChannel;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.channels).poll_next(cx)
    }
}

impl Drop for Incoming {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Binds `bind_address` and starts accepting. Every inbound TCP connection
/// must complete a TLS handshake with a client certificate that chains to
/// the trusted authority before it is yielded.
pub async fn accept_connections(
    credentials: &CredentialSet,
    bind_address: &str,
    handshake_timeout: Duration,
) -> TransportResult<Incoming> {
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(|e| TransportError::Bind {
            addr: bind_address.to_string(),
            reason: e.to_string(),
        })?;
    let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
        addr: bind_address.to_string(),
        reason: e.to_string(),
    })?;

    info!(addr = %local_addr, "Accepting mutual TLS connections");

    let acceptor = TlsAcceptor::from(credentials.server_config());
    let (tx, rx) = mpsc::channel(PENDING_CHANNELS);
    let accept_task = tokio::spawn(accept_loop(listener, acceptor, handshake_timeout, tx));

    Ok(Incoming {
        channels: ReceiverStream::new(rx),
        local_addr,
        accept_task,
    })
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
    tx: mpsc::Sender<ServerChannel>,
) {
    loop {
        let (tcp, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(?e, "Failed to accept TCP connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        if tx.is_closed() {
            break;
        }

        debug!(peer = %peer, "TCP connection accepted");

        let acceptor = acceptor.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let stream = match timeout(handshake_timeout, acceptor.accept(tcp)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    warn!(peer = %peer, error = %e, "TLS handshake failed, dropping connection");
                    return;
                }
                Err(_) => {
                    warn!(
                        peer = %peer,
                        timeout_secs = handshake_timeout.as_secs(),
                        "TLS handshake timed out, dropping connection"
                    );
                    return;
                }
            };

            debug!(peer = %peer, "Client certificate verified");

            if tx.send(Channel { stream, peer }).await.is_err() {
                debug!(peer = %peer, "Server stopped before channel was picked up");
            }
        });
    }
}
