//! # Session
//!
//! One live, duplex, authenticated connection.
//!
//! A session exclusively owns its TCP socket and runs two tokio tasks for its
//! whole lifetime:
//!
//! - the **send loop** drains the outbound queue in FIFO order, encodes each
//!   packet through the [`Gateway`], seals a fresh token for it and writes the
//!   envelope;
//! - the **receive loop** reads one envelope at a time, opens and checks the
//!   token, decodes the payload with the token's source and creation time and
//!   hands the packet to the receive observer.
//!
//! ## Lifecycle
//! `Connected` → `Disconnecting` → `Disconnected`. The first transition is a
//! single compare-and-swap, so however many callers (or failing loops) ask for
//! teardown at once, only one of them cancels the loops. A supervisor task
//! disconnects as soon as either loop stops (a panicking observer included),
//! waits for the other one, drops the socket and calls the disconnect
//! observer exactly once.
//!
//! Errors inside a loop never escape it: they are logged and turned into a
//! teardown. Errors while dialing propagate to the caller.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::NetworkConfig;
use crate::core::codec::EnvelopeCodec;
use crate::core::envelope::Envelope;
use crate::error::{ProtocolError, Result};
use crate::protocol::gateway::Gateway;
use crate::protocol::packet::Packet;
use crate::protocol::token::TokenCodec;
use crate::utils::crypto::{Decryptor, Encryptor};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{self, with_timeout_error};

/// Called once when a session reaches `Disconnected`
pub type DisconnectObserver = Arc<dyn Fn(&Session) + Send + Sync>;

/// Called for every packet written to, or read from, the socket
pub type PacketObserver = Arc<dyn Fn(&Session, &Packet) + Send + Sync>;

const CONNECTED: u8 = 0;
const DISCONNECTING: u8 = 1;
const DISCONNECTED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnecting,
    Disconnected,
}

struct Inner {
    id: Uuid,
    peer: Option<SocketAddr>,
    state: AtomicU8,
    outbound: mpsc::UnboundedSender<Packet>,
    shutdown: CancellationToken,
    closed: CancellationToken,
    on_disconnect: Option<DisconnectObserver>,
    metrics: Arc<Metrics>,
}

/// Handle to a live connection. Cheap to clone; all clones drive the same
/// socket.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Stable identifier, generated at construction
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer
    }

    pub fn state(&self) -> SessionState {
        match self.inner.state.load(Ordering::Acquire) {
            CONNECTED => SessionState::Connected,
            DISCONNECTING => SessionState::Disconnecting,
            _ => SessionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CONNECTED
    }

    /// Enqueue `packet` for the send loop without waiting.
    ///
    /// Packets enqueued after teardown are accepted and silently dropped.
    pub fn send(&self, packet: Packet) {
        if self.inner.outbound.send(packet).is_err() {
            debug!(session = %self.inner.id, "Send loop gone, packet dropped");
        }
    }

    /// Tear the session down now. Queued packets that were not written yet are
    /// lost. Safe to call any number of times from anywhere.
    pub fn disconnect(&self) {
        if self
            .inner
            .state
            .compare_exchange(CONNECTED, DISCONNECTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!(session = %self.inner.id, "Disconnecting");
            self.inner.shutdown.cancel();
        }
    }

    /// Tear the session down once everything queued so far has been written.
    pub fn disconnect_after_flush(&self) {
        if self.inner.outbound.send(Packet::disconnect(self.inner.id)).is_err() {
            self.disconnect();
        }
    }

    /// Wait until the session is `Disconnected` and its observer has run.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    fn report_task(&self, joined: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined {
            error!(error = %e, "Session task aborted");
            self.inner.metrics.loop_error();
        }
    }

    fn finish(&self) {
        self.inner.state.store(DISCONNECTED, Ordering::Release);
        self.inner.metrics.session_closed();
        info!(session = %self.inner.id, "Session disconnected");

        if let Some(observer) = &self.inner.on_disconnect {
            observer(self);
        }
        self.inner.closed.cancel();
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("peer", &self.inner.peer)
            .field("state", &self.state())
            .finish()
    }
}

/// Everything a session needs besides its socket.
///
/// A builder is reusable: a server keeps one and calls [`SessionBuilder::accept`]
/// for every incoming socket. Sessions built from the same builder share its
/// gateway, cipher pair, observers and metrics.
#[derive(Clone)]
pub struct SessionBuilder {
    gateway: Arc<Gateway>,
    tokens: TokenCodec,
    codec: EnvelopeCodec,
    connect_timeout: Duration,
    on_disconnect: Option<DisconnectObserver>,
    on_send: Option<PacketObserver>,
    on_receive: Option<PacketObserver>,
    metrics: Arc<Metrics>,
}

impl SessionBuilder {
    pub fn new(
        gateway: Arc<Gateway>,
        encryptor: Arc<dyn Encryptor>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Self {
            gateway,
            tokens: TokenCodec::new(encryptor, decryptor),
            codec: EnvelopeCodec::default(),
            connect_timeout: timeout::DEFAULT_TIMEOUT,
            on_disconnect: None,
            on_send: None,
            on_receive: None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Builder keyed and bounded by `config`.
    ///
    /// # Errors
    /// `ConfigError` when the configured key is malformed, or missing without
    /// `security.ephemeral_key`.
    pub fn from_config(gateway: Arc<Gateway>, config: &NetworkConfig) -> Result<Self> {
        let crypto = Arc::new(config.security.crypto()?);
        Ok(Self::new(gateway, crypto.clone(), crypto)
            .token_ttl(config.security.token_ttl)
            .max_payload_size(config.transport.max_payload_size)
            .connect_timeout(config.client.connection_timeout))
    }

    pub fn on_disconnect<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(observer));
        self
    }

    pub fn on_send<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Session, &Packet) + Send + Sync + 'static,
    {
        self.on_send = Some(Arc::new(observer));
        self
    }

    pub fn on_receive<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Session, &Packet) + Send + Sync + 'static,
    {
        self.on_receive = Some(Arc::new(observer));
        self
    }

    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.tokens = self.tokens.with_ttl(ttl);
        self
    }

    pub fn max_payload_size(mut self, max: usize) -> Self {
        self.codec = EnvelopeCodec::new(max);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics_handle(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub(crate) fn disconnect_observer(&self) -> Option<DisconnectObserver> {
        self.on_disconnect.clone()
    }

    pub(crate) fn receive_observer(&self) -> Option<PacketObserver> {
        self.on_receive.clone()
    }

    pub(crate) fn with_disconnect_observer(mut self, observer: Option<DisconnectObserver>) -> Self {
        self.on_disconnect = observer;
        self
    }

    pub(crate) fn with_receive_observer(mut self, observer: Option<PacketObserver>) -> Self {
        self.on_receive = observer;
        self
    }

    /// Dial `addr` and start a session on the new socket.
    ///
    /// # Errors
    /// `Connection` when the peer cannot be reached, `Timeout` when dialing
    /// takes longer than the connect timeout.
    pub async fn connect<A: ToSocketAddrs>(&self, addr: A) -> Result<Session> {
        let stream = with_timeout_error(
            async move {
                TcpStream::connect(addr)
                    .await
                    .map_err(|e| ProtocolError::Connection(e.to_string()))
            },
            self.connect_timeout,
        )
        .await?;

        Ok(self.accept(stream))
    }

    /// Start a session on an already connected socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn accept(&self, stream: TcpStream) -> Session {
        let peer = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "Failed to disable Nagle on session socket");
        }
        let (read_half, write_half) = stream.into_split();
        let (outbound, queue) = mpsc::unbounded_channel();

        let session = Session {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                peer,
                state: AtomicU8::new(CONNECTED),
                outbound,
                shutdown: CancellationToken::new(),
                closed: CancellationToken::new(),
                on_disconnect: self.on_disconnect.clone(),
                metrics: self.metrics.clone(),
            }),
        };
        self.metrics.session_opened();

        let span = info_span!("session", id = %session.id());
        if let Some(peer) = peer {
            info!(parent: &span, %peer, "Session connected");
        }

        let sender = SendLoop {
            session: session.clone(),
            queue,
            writer: FramedWrite::new(write_half, self.codec),
            gateway: self.gateway.clone(),
            tokens: self.tokens.clone(),
            on_send: self.on_send.clone(),
        };
        let receiver = ReceiveLoop {
            session: session.clone(),
            reader: FramedRead::new(read_half, self.codec),
            gateway: self.gateway.clone(),
            tokens: self.tokens.clone(),
            on_receive: self.on_receive.clone(),
        };

        let mut send_task = tokio::spawn(sender.run().instrument(span.clone()));
        let mut receive_task = tokio::spawn(receiver.run().instrument(span.clone()));

        let supervised = session.clone();
        tokio::spawn(
            async move {
                // The first loop to stop, even by panicking, takes the other down.
                let send_stopped_first = tokio::select! {
                    joined = &mut send_task => {
                        supervised.report_task(joined);
                        true
                    }
                    joined = &mut receive_task => {
                        supervised.report_task(joined);
                        false
                    }
                };
                supervised.disconnect();

                let remaining = if send_stopped_first {
                    receive_task.await
                } else {
                    send_task.await
                };
                supervised.report_task(remaining);
                supervised.finish();
            }
            .instrument(span),
        );

        session
    }
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("gateway", &self.gateway)
            .field("tokens", &self.tokens)
            .field("codec", &self.codec)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

struct SendLoop {
    session: Session,
    queue: mpsc::UnboundedReceiver<Packet>,
    writer: FramedWrite<OwnedWriteHalf, EnvelopeCodec>,
    gateway: Arc<Gateway>,
    tokens: TokenCodec,
    on_send: Option<PacketObserver>,
}

impl SendLoop {
    async fn run(mut self) {
        if let Err(e) = self.drain().await {
            error!(error = %e, "Stop sending packets");
            self.session.inner.metrics.loop_error();
        }
        self.session.disconnect();
    }

    async fn drain(&mut self) -> Result<()> {
        let shutdown = self.session.inner.shutdown.clone();

        loop {
            let packet = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                next = self.queue.recv() => match next {
                    Some(packet) => packet,
                    None => return Ok(()),
                },
            };

            if packet.is_disconnect() {
                debug!("Disconnect requested through the send queue");
                return Ok(());
            }

            let payload = self.gateway.encode(&packet)?;
            let token = self.tokens.seal(packet.source())?;
            let envelope = Envelope::new(token, packet.alias(), payload);
            let bytes = envelope.encoded_len() as u64;

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                written = self.writer.send(envelope) => written?,
            }

            self.session.inner.metrics.packet_sent(bytes);
            if let Some(observer) = &self.on_send {
                observer(&self.session, &packet);
            }
        }
    }
}

struct ReceiveLoop {
    session: Session,
    reader: FramedRead<OwnedReadHalf, EnvelopeCodec>,
    gateway: Arc<Gateway>,
    tokens: TokenCodec,
    on_receive: Option<PacketObserver>,
}

impl ReceiveLoop {
    async fn run(mut self) {
        if let Err(e) = self.read_all().await {
            error!(error = %e, "Stop receiving packets");
            self.session.inner.metrics.loop_error();
        }
        self.session.disconnect();
    }

    async fn read_all(&mut self) -> Result<()> {
        let shutdown = self.session.inner.shutdown.clone();

        loop {
            let frame = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                frame = self.reader.next() => frame,
            };

            let envelope = match frame {
                Some(envelope) => envelope?,
                None => {
                    debug!("Peer closed the connection");
                    return Ok(());
                }
            };

            let token = self.tokens.open(&envelope.token).inspect_err(|_| {
                self.session.inner.metrics.token_rejected();
            })?;
            let packet =
                self.gateway
                    .decode(envelope.alias, token.source, token.creation, &envelope.payload)?;

            self.session
                .inner
                .metrics
                .packet_received(envelope.encoded_len() as u64);
            if let Some(observer) = &self.on_receive {
                observer(&self.session, &packet);
            }
        }
    }
}
