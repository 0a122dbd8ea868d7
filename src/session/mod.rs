//! Session orchestration
//!
//! The orchestrator is the unit exposed to callers: it drives one session
//! end to end (join, capture, delivery handoff) over a driver it owns
//! exclusively, reporting progress through the broadcaster. The registry
//! is the single mutable slot that gates concurrent sessions in the server
//! variant.

mod orchestrator;
mod registry;

pub use orchestrator::{SessionOrchestrator, SessionRequest, SessionSummary};
pub use registry::{SessionActive, SessionHandle, SessionRegistry};
