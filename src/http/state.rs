use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Single recording slot gating concurrent start requests.
    pub registry: Arc<SessionRegistry>,

    /// Progress fan-out shared with every session started here.
    pub events: Broadcaster,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            events: Broadcaster::new(256),
            config: Arc::new(config),
        }
    }
}
