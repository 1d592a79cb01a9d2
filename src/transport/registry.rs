use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

use super::{EventStream, SessionId, SseTransport, TransportError};

/// Outcome of [`TransportRegistry::close_all`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CloseSummary {
    pub attempted: usize,
    pub failed: usize,
}

/// Live transports by session id.
///
/// Transports report their own closure over a channel owned by the registry;
/// a background task drains it and drops the matching entries. Once
/// [`close_all`](Self::close_all) has started the registry refuses new
/// transports.
pub struct TransportRegistry {
    transports: DashMap<SessionId, Arc<SseTransport>>,
    close_notifier: UnboundedSender<SessionId>,
    shutting_down: AtomicBool,
}

impl TransportRegistry {
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Arc<Self> {
        let (close_notifier, close_events) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            transports: DashMap::new(),
            close_notifier,
            shutting_down: AtomicBool::new(false),
        });

        tokio::spawn(reap_closed(Arc::downgrade(&registry), close_events));
        registry
    }

    /// Creates a transport wired to this registry's close channel. It is not
    /// addressable until [`register`](Self::register) is called.
    pub fn create_transport(&self, endpoint: &str) -> (Arc<SseTransport>, EventStream) {
        SseTransport::new(endpoint, self.close_notifier.clone())
    }

    pub fn register(&self, transport: Arc<SseTransport>) -> Result<SessionId, TransportError> {
        if self.is_shutting_down() {
            return Err(TransportError::ShuttingDown);
        }

        let session_id = transport.session_id().clone();
        match self.transports.entry(session_id.clone()) {
            Entry::Occupied(_) => Err(TransportError::DuplicateSession(session_id)),
            Entry::Vacant(slot) => {
                slot.insert(transport);
                Ok(session_id)
            }
        }
    }

    /// A transport that has already signalled closure is treated as absent.
    pub fn lookup(&self, session_id: &SessionId) -> Option<Arc<SseTransport>> {
        self.transports
            .get(session_id)
            .map(|entry| entry.value().clone())
            .filter(|transport| !transport.is_closed())
    }

    pub fn remove(&self, session_id: &SessionId) -> Option<Arc<SseTransport>> {
        self.transports
            .remove(session_id)
            .map(|(_, transport)| transport)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.transports
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Stops accepting transports, then closes and removes every live one.
    /// Individual failures are logged and counted, never returned.
    pub async fn close_all(&self) -> CloseSummary {
        self.shutting_down.store(true, Ordering::SeqCst);
        let mut summary = CloseSummary::default();

        // A registration that raced the flag may land after a pass.
        loop {
            let session_ids = self.session_ids();
            if session_ids.is_empty() {
                break;
            }

            for session_id in session_ids {
                let Some(transport) = self.remove(&session_id) else {
                    continue;
                };

                summary.attempted += 1;
                info!(session_id = %session_id, "closing transport");
                if let Err(err) = transport.close().await {
                    summary.failed += 1;
                    error!(session_id = %session_id, error = %err, "failed to close transport");
                }
            }
        }

        summary
    }
}

async fn reap_closed(
    registry: Weak<TransportRegistry>,
    mut close_events: UnboundedReceiver<SessionId>,
) {
    while let Some(session_id) = close_events.recv().await {
        let Some(registry) = registry.upgrade() else {
            break;
        };
        let removed = registry.remove(&session_id);
        drop(registry);

        let Some(transport) = removed else {
            continue;
        };

        info!(session_id = %session_id, "sse transport closed");
        if let Err(err) = transport.close().await {
            warn!(session_id = %session_id, error = %err, "close hook failed for disconnected transport");
        }
    }
}
