//! Session registry
//!
//! Maps session ids to their state. Sessions are created on first use;
//! messages for one session are serialized by its mutex, different sessions
//! proceed concurrently.

use crate::error::EngineError;
use crate::machine::PhaseMachine;
use crate::reply::Reply;
use crate::session::Session;
use crate::types::SessionId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Explicit session map owned by the orchestrator
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
    machine: Arc<PhaseMachine>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new(machine: Arc<PhaseMachine>) -> Self {
        Self {
            sessions: DashMap::new(),
            machine,
        }
    }

    /// Shared phase machine
    #[inline]
    #[must_use]
    pub fn machine(&self) -> &Arc<PhaseMachine> {
        &self.machine
    }

    /// Handle a message for a session, creating the session if needed
    ///
    /// # Errors
    /// See [`PhaseMachine::handle`]
    pub async fn handle(&self, id: &SessionId, text: &str) -> Result<Reply, EngineError> {
        let session = self.session(id);
        let mut guard = session.lock().await;
        self.machine.handle(&mut guard, text).await
    }

    /// Reset a session to an empty Understanding state
    ///
    /// # Errors
    /// `EngineError::NotFound` if the session does not exist
    pub async fn reset(&self, id: &SessionId) -> Result<(), EngineError> {
        let session = self.existing(id)?;
        session.lock().await.reset();
        debug!(session = %id, "session reset");
        Ok(())
    }

    /// Remove a session
    ///
    /// # Errors
    /// `EngineError::NotFound` if the session does not exist
    pub fn remove(&self, id: &SessionId) -> Result<(), EngineError> {
        self.sessions
            .remove(id)
            .map(|_| debug!(session = %id, "session removed"))
            .ok_or_else(|| EngineError::not_found(format!("session {id}")))
    }

    /// Copy of a session's current state
    pub async fn snapshot(&self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    /// Check if a session exists
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session(&self, id: &SessionId) -> Arc<Mutex<Session>> {
        let entry = self
            .sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(self.machine.new_session(id.clone()))));
        Arc::clone(entry.value())
    }

    fn existing(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>, EngineError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::not_found(format!("session {id}")))
    }
}
