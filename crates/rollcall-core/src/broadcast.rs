//! Real-time fan-out to session observers
//!
//! One tokio broadcast channel per session topic. Observers join with
//! [`Broadcaster::subscribe`] and leave by dropping the receiver. Publishing
//! to a topic nobody watches is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

use chrono::Utc;
use rollcall_types::{session_topic, AttendanceEvent, SessionEvent, SessionId, TokenEvent};

const DEFAULT_CAPACITY: usize = 64;

/// Fans out rotated tokens and attendance changes per session
pub struct Broadcaster {
    channels: Mutex<HashMap<SessionId, broadcast::Sender<SessionEvent>>>,
    capacity: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster {
    /// Create a broadcaster with the given per-channel buffer capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, broadcast::Sender<SessionEvent>>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Join a session's channel
    pub fn subscribe(&self, session: SessionId) -> broadcast::Receiver<SessionEvent> {
        let mut channels = self.lock();
        channels
            .entry(session)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Emit a freshly rotated token to the session's observers
    pub fn publish_token(&self, session: SessionId, token: &str) {
        self.publish(
            session,
            SessionEvent::Token(TokenEvent {
                token: token.to_string(),
                timestamp: Utc::now().timestamp_millis(),
            }),
        );
    }

    /// Emit an attendance change to the session's observers
    pub fn publish_attendance(&self, session: SessionId, event: AttendanceEvent) {
        self.publish(session, SessionEvent::Attendance(event));
    }

    /// Drop the channel for a session that no longer emits events
    pub fn remove(&self, session: SessionId) {
        self.lock().remove(&session);
    }

    fn publish(&self, session: SessionId, event: SessionEvent) {
        let channels = self.lock();
        if let Some(tx) = channels.get(&session) {
            // Err means no live receivers; nothing to deliver
            if tx.send(event).is_ok() {
                tracing::debug!(topic = %session_topic(session), "broadcast event");
            }
        }
    }
}
