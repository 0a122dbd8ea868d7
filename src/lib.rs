pub mod broadcast;
pub mod capture;
pub mod config;
pub mod delivery;
pub mod driver;
pub mod http;
pub mod join;
pub mod session;

pub use broadcast::{BroadcastEvent, Broadcaster, EventKind};
pub use capture::{CaptureState, CaptureSupervisor};
pub use config::Config;
pub use delivery::{DeliveryJob, DeliveryOutcome};
pub use driver::{ChromeDriver, ChromeOptions, Driver, DriverError, Locator};
pub use http::{create_router, AppState};
pub use join::{
    FailReason, JoinAttempt, JoinConfig, JoinOutcome, JoinState, LocatorProfile, RefreshStrategy,
    VerificationResult,
};
pub use session::{SessionHandle, SessionOrchestrator, SessionRegistry, SessionRequest};
