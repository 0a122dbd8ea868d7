//! Transient-overlay dismissal
//!
//! Conferencing UIs interleave the pre-join flow with consent prompts,
//! notification asks and device warnings. Each known overlay is described
//! by a signature; dismissal walks the list, clicks whatever is present and
//! moves on. A missing popup is the expected steady state, never an error.

use crate::broadcast::Broadcaster;
use crate::driver::{Driver, DriverError, Locator};
use std::time::Duration;
use tracing::debug;

/// Bounded lookup per signature; overlays either exist now or not at all.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// One known transient overlay and the control that dismisses it.
#[derive(Debug, Clone)]
pub struct PopupSignature {
    pub label: &'static str,
    pub locator: Locator,
}

impl PopupSignature {
    pub fn new(label: &'static str, locator: Locator) -> Self {
        Self { label, locator }
    }
}

/// Dismiss any pending overlays, best-effort.
///
/// Only genuine driver failures propagate; absent popups are skipped and a
/// popup that vanishes between lookup and click is treated as dismissed.
pub async fn dismiss(
    driver: &dyn Driver,
    signatures: &[PopupSignature],
    settle: (Duration, Duration),
    events: &Broadcaster,
) -> Result<(), DriverError> {
    for signature in signatures {
        match driver.wait_for_element(&signature.locator, LOOKUP_TIMEOUT).await {
            Ok(()) => {
                match driver.click(&signature.locator).await {
                    Ok(()) => {
                        events.status(format!("popup \"{}\" dismissed", signature.label));
                        super::jittered_sleep(settle.0, settle.1).await;
                    }
                    Err(err) if err.is_absence() => {
                        debug!("popup \"{}\" vanished before click", signature.label);
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(err) if err.is_absence() => {
                debug!("popup \"{}\" not present", signature.label);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
