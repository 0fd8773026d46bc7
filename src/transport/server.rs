use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::dispatcher::HandlerDispatch;
use crate::protocol::packet::Packet;
use crate::service::session::{
    DisconnectObserver, PacketObserver, Session, SessionBuilder, SessionState,
};
use crate::utils::timeout;

/// Outbound delivery used by the game layer: the map decides what goes to
/// whom, sessions carry it.
pub trait DispatchSink: Send + Sync {
    /// Send `packet` to the session `target`, or to every session when `None`.
    fn dispatch(&self, packet: Packet, target: Option<Uuid>);
}

/// Live sessions of a server, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DIRECTORY_LOCK.to_string()))?;
        sessions.insert(session.id(), session);
        Ok(())
    }

    pub fn remove(&self, id: &Uuid) -> Option<Session> {
        self.sessions.write().ok()?.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.sessions.read().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the sessions currently registered
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions
            .read()
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Ask every session to disconnect once its queue is written out.
    pub fn disconnect_all(&self) {
        for session in self.sessions() {
            session.disconnect_after_flush();
        }
    }
}

impl DispatchSink for SessionDirectory {
    fn dispatch(&self, packet: Packet, target: Option<Uuid>) {
        match target {
            None => {
                for session in self.sessions() {
                    session.send(packet.clone());
                }
            }
            Some(id) => match self.get(&id) {
                Some(session) => session.send(packet),
                None => debug!(target_session = %id, %packet, "No such session, packet dropped"),
            },
        }
    }
}

/// TCP server wrapping every accepted socket in a [`Session`].
pub struct Server {
    listener: TcpListener,
    builder: SessionBuilder,
    directory: Arc<SessionDirectory>,
    dispatch: Option<HandlerDispatch>,
    max_connections: usize,
    shutdown_timeout: Duration,
}

impl Server {
    /// Bind a listener on `addr`.
    pub async fn bind<A: ToSocketAddrs>(addr: A, builder: SessionBuilder) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            builder,
            directory: Arc::new(SessionDirectory::new()),
            dispatch: None,
            max_connections: ServerConfig::default().max_connections,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
        })
    }

    /// Bind on the configured address with the configured limits.
    pub async fn from_config(config: &ServerConfig, builder: SessionBuilder) -> Result<Self> {
        Ok(Self::bind(config.address.as_str(), builder)
            .await?
            .max_connections(config.max_connections)
            .shutdown_timeout(config.shutdown_timeout))
    }

    /// Delegate every received packet to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: HandlerDispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn directory(&self) -> Arc<SessionDirectory> {
        self.directory.clone()
    }

    /// Serve until CTRL+C.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.run_with_shutdown(shutdown_rx).await
    }

    /// Serve until `shutdown_rx` yields (or its sender is dropped).
    #[instrument(skip(self, shutdown_rx), fields(address = ?self.listener.local_addr().ok()))]
    pub async fn run_with_shutdown(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        let builder = self.session_builder();
        info!(max_connections = self.max_connections, "Accepting sessions");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server. Waiting for sessions to close...");
                    self.drain().await;
                    return Ok(());
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            if self.directory.len() >= self.max_connections {
                                warn!(%peer, limit = self.max_connections, "Connection limit reached, rejecting");
                                continue;
                            }

                            let session = builder.accept(stream);
                            if let Err(e) = self.directory.insert(session.clone()) {
                                error!(error = %e, "Failed to register session");
                                session.disconnect();
                                continue;
                            }
                            // Session may already have finished before it was registered.
                            if session.state() == SessionState::Disconnected {
                                self.directory.remove(&session.id());
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Error accepting connection");
                        }
                    }
                }
            }
        }
    }

    /// Wrap the user's observers so the directory and dispatch stay in sync.
    fn session_builder(&self) -> SessionBuilder {
        let directory = self.directory.clone();
        let user_disconnect = self.builder.disconnect_observer();
        let on_disconnect: DisconnectObserver = Arc::new(move |session: &Session| {
            directory.remove(&session.id());
            if let Some(observer) = &user_disconnect {
                observer(session);
            }
        });

        let user_receive = self.builder.receive_observer();
        let on_receive = match self.dispatch.clone() {
            None => user_receive,
            Some(dispatch) => {
                let observer: PacketObserver = Arc::new(move |session: &Session, packet: &Packet| {
                    if let Some(observer) = &user_receive {
                        observer(session, packet);
                    }
                    if let Err(e) = dispatch.delegate(packet) {
                        warn!(session = %session.id(), %packet, error = %e, "Packet not handled");
                    }
                });
                Some(observer)
            }
        };

        self.builder
            .clone()
            .with_disconnect_observer(Some(on_disconnect))
            .with_receive_observer(on_receive)
    }

    async fn drain(&self) {
        self.directory.disconnect_all();

        let deadline = tokio::time::sleep(self.shutdown_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(remaining = self.directory.len(), "Shutdown timeout reached, forcing disconnect");
                    for session in self.directory.sessions() {
                        session.disconnect();
                    }
                    break;
                }
                _ = tokio::time::sleep(Duration::from_millis(50)) => {
                    let sessions = self.directory.len();
                    debug!(sessions, "Waiting for sessions to close");
                    if sessions == 0 {
                        info!("All sessions closed, shutting down");
                        break;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("sessions", &self.directory.len())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}
