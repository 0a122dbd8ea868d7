//! Page-recovery tactics of increasing invasiveness
//!
//! When verification keeps failing, the join machine cycles through these
//! strategies by refresh index, so a tactic that already failed is not
//! repeated before the others have been tried.

use crate::driver::{Driver, DriverError};
use std::time::Duration;
use tracing::{info, warn};

/// Pause on the blank page before re-navigating in [`RefreshStrategy::FreshContext`].
const BLANK_PAUSE: Duration = Duration::from_secs(1);

const UNREGISTER_SERVICE_WORKERS: &str = r#"
    if ('serviceWorker' in navigator) {
        navigator.serviceWorker.getRegistrations()
            .then((registrations) => registrations.forEach((reg) => reg.unregister()));
    }
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStrategy {
    /// Standard reload of the current document.
    SoftReload,
    /// Full re-navigation to the target URL.
    HardNavigation,
    /// In-page forced reload bypassing the HTTP cache.
    CacheBypass,
    /// Blank page first, drop service workers, then re-navigate.
    FreshContext,
}

pub const STRATEGIES: [RefreshStrategy; 4] = [
    RefreshStrategy::SoftReload,
    RefreshStrategy::HardNavigation,
    RefreshStrategy::CacheBypass,
    RefreshStrategy::FreshContext,
];

impl RefreshStrategy {
    /// Strategy for the k-th refresh (1-based): `STRATEGIES[(k - 1) % len]`.
    pub fn select(refresh_index: u32) -> Self {
        STRATEGIES[(refresh_index as usize - 1) % STRATEGIES.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RefreshStrategy::SoftReload => "soft_reload",
            RefreshStrategy::HardNavigation => "hard_navigation",
            RefreshStrategy::CacheBypass => "cache_bypass",
            RefreshStrategy::FreshContext => "fresh_context",
        }
    }
}

/// Timing knobs for a single refresh application.
#[derive(Debug, Clone)]
pub struct RefreshTiming {
    /// Deadline for applying one strategy.
    pub op_timeout: Duration,

    /// Fixed wait after an in-page forced reload, which emits no load signal.
    pub reload_settle: Duration,

    /// Randomized stabilization window after a successful refresh.
    pub settle: (Duration, Duration),
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_secs(30),
            reload_settle: Duration::from_secs(8),
            settle: (Duration::from_secs(2), Duration::from_secs(5)),
        }
    }
}

/// Apply one recovery strategy. Returns whether it completed; a failure
/// advances the caller to the next strategy rather than aborting the
/// attempt.
pub async fn refresh(
    driver: &dyn Driver,
    target: &str,
    strategy: RefreshStrategy,
    timing: &RefreshTiming,
) -> bool {
    info!("refreshing page with strategy {}", strategy.name());

    match tokio::time::timeout(timing.op_timeout, apply(driver, target, strategy, timing)).await {
        Ok(Ok(())) => {
            super::jittered_sleep(timing.settle.0, timing.settle.1).await;
            true
        }
        Ok(Err(err)) => {
            warn!("refresh ({}) failed: {}", strategy.name(), err);
            false
        }
        Err(_) => {
            warn!(
                "refresh ({}) timed out after {:?}",
                strategy.name(),
                timing.op_timeout
            );
            false
        }
    }
}

async fn apply(
    driver: &dyn Driver,
    target: &str,
    strategy: RefreshStrategy,
    timing: &RefreshTiming,
) -> Result<(), DriverError> {
    match strategy {
        RefreshStrategy::SoftReload => driver.reload().await,
        RefreshStrategy::HardNavigation => driver.navigate(target).await,
        RefreshStrategy::CacheBypass => {
            driver.evaluate("window.location.reload(true)").await?;
            tokio::time::sleep(timing.reload_settle).await;
            Ok(())
        }
        RefreshStrategy::FreshContext => {
            driver.navigate("about:blank").await?;
            tokio::time::sleep(BLANK_PAUSE).await;
            if let Err(err) = driver.evaluate(UNREGISTER_SERVICE_WORKERS).await {
                warn!("service worker cleanup skipped: {}", err);
            }
            driver.navigate(target).await
        }
    }
}
