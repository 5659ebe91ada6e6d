//! Per-session token rotation
//!
//! One repeating timer per active session, owned by a scheduler service
//! rather than ambient global state. Starting rotation for a session
//! atomically replaces any prior timer for the same id, so two rotation
//! loops can never overlap for one session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::token::TokenCodec;
use rollcall_db::SessionRepository;
use rollcall_types::{DomainId, SessionId, SessionPhase};

/// Owns the rotation timers for all active sessions
pub struct RotationScheduler<S: SessionRepository> {
    codec: TokenCodec,
    broadcaster: Arc<Broadcaster>,
    sessions: Arc<S>,
    interval: Duration,
    timers: Mutex<HashMap<SessionId, JoinHandle<()>>>,
}

impl<S: SessionRepository + 'static> RotationScheduler<S> {
    /// Create a scheduler; `interval` is the token TTL
    pub fn new(
        codec: TokenCodec,
        broadcaster: Arc<Broadcaster>,
        sessions: Arc<S>,
        interval: Duration,
    ) -> Self {
        Self {
            codec,
            broadcaster,
            sessions,
            interval,
            timers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, JoinHandle<()>>> {
        self.timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start (or restart) rotation for a session.
    ///
    /// The counter resets to 0, the first token is minted and broadcast
    /// before this returns, and a tick then fires every interval. Any
    /// previous timer for the same session is cancelled first; switching
    /// phase is just a restart with the new phase.
    pub fn start(&self, session: SessionId, domain: DomainId, phase: SessionPhase) {
        // Cancel any previous timer first so a pending tick of the old
        // phase can neither broadcast after the new first token nor
        // persist its counter over the reset.
        if let Some(previous) = self.lock().remove(&session) {
            previous.abort();
            tracing::debug!(%session, "replaced existing rotation timer");
        }

        let token = self.codec.mint(session, domain, 0, phase);
        self.broadcaster.publish_token(session, &token);

        let codec = self.codec.clone();
        let broadcaster = Arc::clone(&self.broadcaster);
        let sessions = Arc::clone(&self.sessions);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            let mut rot: i64 = 0;
            loop {
                ticker.tick().await;
                rot += 1;
                let token = codec.mint(session, domain, rot, phase);
                broadcaster.publish_token(session, &token);
                // Verification reads the expected counter from the store;
                // a persistence failure must not stop the timer.
                if let Err(err) = sessions.set_rotation_counter(session.0, rot).await {
                    tracing::error!(%session, rot, "failed to persist rotation counter: {err}");
                }
            }
        });

        self.lock().insert(session, handle);
        tracing::debug!(%session, %phase, "rotation started");
    }

    /// Stop rotation for a session.
    ///
    /// The timer is halted before this returns; no token is minted for the
    /// session afterwards.
    pub fn stop(&self, session: SessionId) {
        let handle = self.lock().remove(&session);
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!(%session, "rotation stopped");
        }
    }

    /// Whether a rotation timer currently exists for the session
    pub fn is_running(&self, session: SessionId) -> bool {
        self.lock().contains_key(&session)
    }

    /// Number of sessions currently rotating
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

impl<S: SessionRepository> Drop for RotationScheduler<S> {
    fn drop(&mut self) {
        let mut timers = self
            .timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}
