//! Progress fan-out to session observers
//!
//! Every stage of a session reports through a [`Broadcaster`]. Observers
//! (the console logger, WebSocket clients) each hold their own receiver;
//! a receiver that is dropped or falls behind simply stops getting events.
//! Sending with zero observers is not an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Classification of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Status,
    Info,
    Warning,
    Error,
    Success,
    RecordingStarted,
    Finished,
}

/// A single progress event, JSON-encoded on the wire for observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    pub message: String,

    /// Recording length in seconds, present on `recording_started` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl BroadcastEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            duration_secs: None,
        }
    }
}

/// Fan-out channel for session progress.
///
/// Cloning is cheap; all clones feed the same set of observers.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }

    /// Push an event to every currently-connected observer.
    pub fn send(&self, event: BroadcastEvent) {
        // A send error only means there are no observers right now.
        let _ = self.tx.send(event);
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(BroadcastEvent::new(EventKind::Status, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(BroadcastEvent::new(EventKind::Info, message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(BroadcastEvent::new(EventKind::Warning, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(BroadcastEvent::new(EventKind::Error, message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(BroadcastEvent::new(EventKind::Success, message));
    }

    pub fn finished(&self, message: impl Into<String>) {
        self.send(BroadcastEvent::new(EventKind::Finished, message));
    }

    pub fn recording_started(&self, message: impl Into<String>, duration_secs: u64) {
        self.send(BroadcastEvent {
            kind: EventKind::RecordingStarted,
            message: message.into(),
            duration_secs: Some(duration_secs),
        });
    }
}

/// Mirror broadcast events into the process log.
///
/// This is the observer used by the single-shot CLI; the server variant
/// runs it too so progress is visible without a WebSocket client attached.
pub fn spawn_console_observer(broadcaster: &Broadcaster) -> JoinHandle<()> {
    let mut rx = broadcaster.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.kind {
                    EventKind::Warning => warn!("{}", event.message),
                    EventKind::Error => error!("{}", event.message),
                    _ => info!("{}", event.message),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("console observer lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
