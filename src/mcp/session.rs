//! Registry of live SSE sessions.
//!
//! POST handlers only know a session id; the registry maps it to the
//! transport feeding that session's open event stream. Each operation is
//! atomic per key.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mcp::transport::SseTransport;

/// Session id → live transport.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SseTransport>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport under its session id. Fails if the id is taken.
    pub fn register(&self, transport: Arc<SseTransport>) -> Result<()> {
        let session_id = transport.session_id().to_string();
        match self.sessions.entry(session_id) {
            Entry::Occupied(entry) => Err(Error::DuplicateSession(entry.key().clone())),
            Entry::Vacant(entry) => {
                info!("Session opened: {}", entry.key());
                entry.insert(transport);
                Ok(())
            }
        }
    }

    /// Find the transport for `session_id`.
    pub fn lookup(&self, session_id: &str) -> Result<Arc<SseTransport>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Remove a session. Returns whether it was present.
    pub fn unregister(&self, session_id: &str) -> bool {
        match self.sessions.remove(session_id) {
            Some((_, transport)) => {
                transport.close();
                info!("Session closed: {}", session_id);
                true
            }
            None => {
                debug!("Session already gone: {}", session_id);
                false
            }
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Removes its session from the registry when dropped.
///
/// Owned by the SSE response stream, so a client disconnect unregisters the
/// session without any explicit close call.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session_id: String,
}

impl SessionGuard {
    pub fn new(registry: Arc<SessionRegistry>, session_id: impl Into<String>) -> Self {
        Self {
            registry,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.session_id);
    }
}
