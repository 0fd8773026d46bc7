use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packet::{Packet, PacketKind};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Business effect of one packet kind.
pub trait PacketHandler: Send + Sync + 'static {
    fn handle(&self, packet: &Packet) -> Result<()>;
}

impl<F> PacketHandler for F
where
    F: Fn(&Packet) -> Result<()> + Send + Sync + 'static,
{
    fn handle(&self, packet: &Packet) -> Result<()> {
        self(packet)
    }
}

/// Routes decoded packets to the handler bound for their kind.
/// At most one handler per kind; the last bind wins.
#[derive(Clone)]
pub struct HandlerDispatch {
    handlers: Arc<RwLock<HashMap<PacketKind, Arc<dyn PacketHandler>>>>,
}

impl Default for HandlerDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerDispatch {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn bind<H>(&self, kind: PacketKind, handler: H) -> Result<&Self>
    where
        H: PacketHandler,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert(kind, Arc::new(handler));
        debug!(%kind, "Bound packet handler");
        Ok(self)
    }

    pub fn is_bound(&self, kind: PacketKind) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(&kind))
            .unwrap_or(false)
    }

    /// Hand `packet` to the handler bound for its kind.
    ///
    /// # Errors
    /// `HandlerNotBound` if nothing is bound for the kind, otherwise whatever
    /// the handler returns.
    pub fn delegate(&self, packet: &Packet) -> Result<()> {
        let kind = packet.kind();

        // Release the lock before running the handler so it may bind.
        let handler = {
            let handlers = self.handlers.read().map_err(|_| {
                ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
            })?;
            handlers.get(&kind).cloned()
        };

        match handler {
            Some(handler) => handler.handle(packet),
            None => {
                warn!(%kind, source = %packet.source(), "No handler bound, packet not delivered");
                Err(ProtocolError::HandlerNotBound(kind))
            }
        }
    }
}

impl std::fmt::Debug for HandlerDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<PacketKind> = self
            .handlers
            .read()
            .map(|h| h.keys().copied().collect())
            .unwrap_or_default();
        kinds.sort();
        f.debug_struct("HandlerDispatch").field("bound", &kinds).finish()
    }
}
