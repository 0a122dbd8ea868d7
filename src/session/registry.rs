use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::info;

/// Identity and stop channel of a running session.
pub struct SessionHandle {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    stop_tx: watch::Sender<bool>,
}

impl SessionHandle {
    /// Create a handle plus the receiver the orchestrator listens on.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        (
            Self {
                session_id: format!("session-{}", uuid::Uuid::new_v4()),
                started_at: Utc::now(),
                stop_tx,
            },
            stop_rx,
        )
    }

    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Returned when the single session slot is occupied.
#[derive(Debug, thiserror::Error)]
#[error("a session is already active")]
pub struct SessionActive;

/// Mutex-guarded single session slot.
///
/// A second acquire while a session is in flight is rejected, never queued.
/// The slot is released at teardown, so a subsequent session can start.
pub struct SessionRegistry {
    slot: Mutex<Option<SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Claim the slot for `handle`; fails if a session is already active.
    pub async fn acquire(&self, handle: SessionHandle) -> Result<(), SessionActive> {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Err(SessionActive);
        }
        info!("session {} acquired the recording slot", handle.session_id);
        *slot = Some(handle);
        Ok(())
    }

    /// Signal the active session to stop. Returns whether one was signaled.
    pub async fn signal_stop(&self) -> bool {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(handle) => {
                handle.signal_stop();
                true
            }
            None => false,
        }
    }

    pub async fn release(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.take() {
            info!("session {} released the recording slot", handle.session_id);
        }
    }

    pub async fn is_active(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
