//! Connectionless request/response server over UDP with per-peer shared secrets.
//!
//! # Data Flow
//! ```text
//! datagram from peer
//!     → SecretSource (peer → secret, dropped when unknown)
//!     → PacketHandler on its own task
//!     → optional response datagram back to peer
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::task::JoinSet;

use super::bind_first;
use super::resolve;
use super::Options;
use crate::config::PacketConfig;
use crate::config::DEFAULT_PACKET_SHUTDOWN_TIMEOUT;
use crate::error::Error;
use crate::report::SharedReporter;
use crate::service::Service;
use crate::service::ServiceFuture;

/// Port used when no address is configured.
pub const DEFAULT_PORT: u16 = 1812;

/// Largest datagram read from the socket.
pub const MAX_PACKET_SIZE: usize = 4096;

/// A datagram received from an authenticated peer.
#[derive(Debug, Clone)]
pub struct Packet {
    pub peer: SocketAddr,
    /// The secret shared with `peer`, never empty.
    pub secret: Arc<[u8]>,
    pub payload: Vec<u8>,
}

/// Processes one packet and optionally produces a response datagram.
pub trait PacketHandler: Send + Sync + 'static {
    fn serve_packet(&self, packet: Packet) -> BoxFuture<'static, Option<Vec<u8>>>;
}

impl<F, Fut> PacketHandler for F
where
    F: Fn(Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Vec<u8>>> + Send + 'static,
{
    fn serve_packet(&self, packet: Packet) -> BoxFuture<'static, Option<Vec<u8>>> {
        Box::pin(self(packet))
    }
}

/// Looks up the secret shared with a peer.
pub trait SecretSource: Send + Sync + 'static {
    fn secret(&self, peer: SocketAddr) -> Option<Arc<[u8]>>;
}

impl<F> SecretSource for F
where
    F: Fn(SocketAddr) -> Option<Arc<[u8]>> + Send + Sync + 'static,
{
    fn secret(&self, peer: SocketAddr) -> Option<Arc<[u8]>> {
        self(peer)
    }
}

/// Shares one secret with every peer.
#[derive(Debug, Clone)]
pub struct StaticSecret(Arc<[u8]>);

impl StaticSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }
}

impl SecretSource for StaticSecret {
    fn secret(&self, _peer: SocketAddr) -> Option<Arc<[u8]>> {
        Some(self.0.clone())
    }
}

/// Description of a packet server, validated by [`PacketService::new`].
#[derive(Default, Clone)]
pub struct PacketServer {
    /// Empty means port 1812 on the wildcard address of the network.
    pub addr: String,
    /// `udp`, `udp4` or `udp6`; empty means `udp`.
    pub network: String,
    pub handler: Option<Arc<dyn PacketHandler>>,
    pub secret_source: Option<Arc<dyn SecretSource>>,
}

impl PacketServer {
    pub fn new(handler: impl PacketHandler, secret_source: impl SecretSource) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            secret_source: Some(Arc::new(secret_source)),
            ..Self::default()
        }
    }

    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    Udp,
    Udp4,
    Udp6,
}

impl Network {
    fn parse(network: &str) -> Result<Self, Error> {
        match network {
            "" | "udp" => Ok(Network::Udp),
            "udp4" => Ok(Network::Udp4),
            "udp6" => Ok(Network::Udp6),
            other => Err(Error::Config(format!("unsupported packet network {other:?}"))),
        }
    }

    /// `udp` binds the IPv6 wildcard, which is dual-stack unless the host sets
    /// `IPV6_V6ONLY` by default; hosts without IPv6 fall back to IPv4.
    fn default_addrs(self) -> Vec<SocketAddr> {
        let v4 = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT));
        let v6 = SocketAddr::from(([0u16; 8], DEFAULT_PORT));
        match self {
            Network::Udp => vec![v6, v4],
            Network::Udp4 => vec![v4],
            Network::Udp6 => vec![v6],
        }
    }

    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Udp => true,
            Network::Udp4 => addr.is_ipv4(),
            Network::Udp6 => addr.is_ipv6(),
        }
    }
}

/// Runs a [`PacketServer`] as a [`Service`].
///
/// `stop` stops reading new datagrams and waits up to the shutdown timeout
/// (3s by default) for handlers already running; handlers still running at
/// the deadline are aborted.
pub struct PacketService {
    name: String,
    /// Empty binds the default address of `network`.
    addr: String,
    network: Network,
    handler: Arc<dyn PacketHandler>,
    secret_source: Arc<dyn SecretSource>,
    options: Options,
    running: Option<Running>,
}

struct Running {
    shutdown: oneshot::Sender<Duration>,
    /// Resolves to whether every handler finished before the deadline.
    task: JoinHandle<bool>,
    local_addr: SocketAddr,
}

impl PacketService {
    /// Validates `server`; a missing handler or secret source is an error.
    pub fn new(server: PacketServer) -> Result<Self, Error> {
        let handler = server
            .handler
            .ok_or_else(|| Error::Config("packet: nil Handler".into()))?;
        let secret_source = server
            .secret_source
            .ok_or_else(|| Error::Config("packet: nil SecretSource".into()))?;
        let network = Network::parse(&server.network)?;
        let name = if server.addr.is_empty() {
            format!("udp://:{DEFAULT_PORT}")
        } else {
            format!("udp://{}", server.addr)
        };

        Ok(Self {
            name,
            addr: server.addr,
            network,
            handler,
            secret_source,
            options: Options::new(DEFAULT_PACKET_SHUTDOWN_TIMEOUT),
            running: None,
        })
    }

    /// Builds a service from serializable settings; non-empty `config.addr`
    /// and `config.network` override those of `server`.
    pub fn from_config(config: &PacketConfig, server: PacketServer) -> Result<Self, Error> {
        let mut server = server;
        if !config.addr.is_empty() {
            server.addr = config.addr.clone();
        }
        if !config.network.is_empty() {
            server.network = config.network.clone();
        }
        Ok(Self::new(server)?
            .shutdown_timeout(config.shutdown_timeout)
            .skip_errors(config.skip_errors))
    }

    /// Sets how long `stop` waits for running handlers. Zero is ignored.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.options.shutdown_timeout = timeout;
        }
        self
    }

    /// When set, every `start`/`stop` failure is reported as success and
    /// serve-loop faults are not reported.
    pub fn skip_errors(mut self, skip: bool) -> Self {
        self.options.skip_errors = skip;
        self
    }

    pub fn reporter(mut self, reporter: SharedReporter) -> Self {
        self.options.reporter = reporter;
        self
    }

    /// The bound address while the service is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    fn candidates(&self) -> Result<Vec<SocketAddr>, Error> {
        if self.addr.is_empty() {
            return Ok(self.network.default_addrs());
        }
        let network = self.network;
        resolve(&self.addr, |a| network.accepts(a))
    }

    fn launch(&mut self) -> Result<(), Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let candidates = self.candidates()?;
        let socket = bind_first(&self.addr, &candidates, |a| {
            let socket = std::net::UdpSocket::bind(a)?;
            socket.set_nonblocking(true)?;
            UdpSocket::from_std(socket)
        })?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| Error::bind(&self.addr, e))?;

        let (shutdown, signal) = oneshot::channel();
        let serve = serve(
            Arc::new(socket),
            self.handler.clone(),
            self.secret_source.clone(),
            signal,
        );
        let name = self.name.clone();
        let options = self.options.clone();
        let task = tokio::spawn(async move {
            match serve.await {
                Ok(drained) => drained,
                Err(err) => {
                    options.fault(&name, Error::Serve(err));
                    true
                }
            }
        });

        tracing::info!(address = %local_addr, service = %self.name, "packet server listening");
        self.running = Some(Running {
            shutdown,
            task,
            local_addr,
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Error> {
        let Some(Running {
            shutdown,
            task,
            local_addr,
        }) = self.running.take()
        else {
            return Ok(());
        };

        let timeout = self.options.shutdown_timeout;
        tracing::info!(address = %local_addr, ?timeout, "packet server shutting down");
        // The loop may already have exited on a serve error.
        let _ = shutdown.send(timeout);
        if task.await? {
            tracing::debug!(address = %local_addr, "packet server stopped");
            Ok(())
        } else {
            tracing::warn!(address = %local_addr, ?timeout, "packet handlers aborted");
            Err(Error::ShutdownTimeout(timeout))
        }
    }
}

impl Service for PacketService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> ServiceFuture<'_> {
        Box::pin(async move {
            let result = self.launch();
            self.options.outcome(result)
        })
    }

    fn stop(&mut self) -> ServiceFuture<'_> {
        Box::pin(async move {
            let result = self.shutdown().await;
            self.options.outcome(result)
        })
    }
}

/// Reads datagrams until `signal` delivers a grace period, then waits that
/// long for running handlers before aborting them.
///
/// Returns whether every handler finished within the grace period.
async fn serve(
    socket: Arc<UdpSocket>,
    handler: Arc<dyn PacketHandler>,
    secrets: Arc<dyn SecretSource>,
    mut signal: oneshot::Receiver<Duration>,
) -> std::io::Result<bool> {
    let mut inflight = JoinSet::new();
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    let grace = loop {
        tokio::select! {
            // A dropped sender means the service itself was dropped.
            grace = &mut signal => break grace.unwrap_or(Duration::ZERO),
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(received) => received,
                    Err(err) if is_transient(&err) => continue,
                    Err(err) => return Err(err),
                };
                let secret = match secrets.secret(peer) {
                    Some(secret) if !secret.is_empty() => secret,
                    _ => {
                        tracing::debug!(%peer, "dropping packet from peer without secret");
                        continue;
                    }
                };
                let packet = Packet {
                    peer,
                    secret,
                    payload: buf[..len].to_vec(),
                };
                let handler = handler.clone();
                let socket = socket.clone();
                inflight.spawn(async move {
                    if let Some(response) = handler.serve_packet(packet).await {
                        if let Err(err) = socket.send_to(&response, peer).await {
                            tracing::debug!(%peer, error = %err, "failed to send response");
                        }
                    }
                });
            }
        }
    };

    let drain = async {
        while inflight.join_next().await.is_some() {}
    };
    if tokio::time::timeout(grace, drain).await.is_ok() {
        return Ok(true);
    }
    inflight.shutdown().await;
    Ok(false)
}

fn is_transient(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}
