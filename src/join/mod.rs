//! Join attempt state machine
//!
//! One [`JoinAttempt`] is a complete end-to-end try at reaching a connected
//! state: navigate, verify the page loaded (escalating through refresh
//! strategies when it did not), clear overlays, suppress outgoing media,
//! enter a guest name, submit the join request, and confirm admission.
//! The orchestrator retries whole attempts with a jittered linear backoff.

pub mod popups;
pub mod profile;
pub mod refresh;
pub mod verify;

pub use popups::PopupSignature;
pub use profile::LocatorProfile;
pub use refresh::{RefreshStrategy, RefreshTiming};
pub use verify::VerificationResult;

use crate::broadcast::Broadcaster;
use crate::driver::{Driver, DriverError};
use rand::Rng;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Why a join attempt ended without connecting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailReason {
    #[error("page verification exhausted all refresh strategies")]
    LoadVerificationExhausted,

    #[error("admission timed out or join control missing")]
    AdmissionTimeoutOrControlMissing,

    #[error("driver failure: {0}")]
    Driver(String),
}

/// Terminal once Connected; a connected attempt never becomes Failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Pending,
    Connected,
    Failed(FailReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    Navigating,
    Verifying,
    Refreshing(u32),
    PopupHandling,
    PreparingControls,
    AwaitingNameEntry,
    Submitting,
    ConfirmingConnected,
    Connected,
    Failed(FailReason),
}

/// Budgets and pacing for join attempts.
///
/// There is no single join deadline: the chain of per-operation timeouts
/// bounds total latency instead.
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// Full attempts before giving up.
    pub max_retries: u32,

    /// Refresh escalations within one attempt.
    pub max_refreshes: u32,

    /// Fraction of verification checks that must pass.
    pub verification_threshold: f64,

    /// Settle delay before each verification pass.
    pub verification_settle: Duration,

    /// Soft deadline on the initial navigation; a timed-out navigation
    /// still proceeds to verification.
    pub navigation_timeout: Duration,

    pub refresh: RefreshTiming,

    /// Lookup window for the guest-name field; absence means an
    /// authenticated profile is active.
    pub name_entry_timeout: Duration,

    /// Lookup window for the join control.
    pub submit_timeout: Duration,

    /// How long to wait for the post-join landmark after submitting.
    pub admission_timeout: Duration,

    /// Base delay between attempts.
    pub retry_delay: Duration,

    /// Per-attempt increment: remote admission delay is roughly
    /// attempt-proportional, so backoff is linear, not exponential.
    pub retry_step: Duration,

    /// Upper bound of the random component added to each backoff.
    pub retry_jitter: Duration,

    /// Randomized pause between interaction steps.
    pub step_settle: (Duration, Duration),

    /// Randomized inter-keystroke delay for guest-name entry.
    pub keystroke_delay: (Duration, Duration),

    /// Guest display name shown to other participants.
    pub guest_name: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        let tag: u16 = rand::thread_rng().gen_range(0..1000);
        Self {
            max_retries: 5,
            max_refreshes: 4,
            verification_threshold: verify::DEFAULT_THRESHOLD,
            verification_settle: Duration::from_secs(3),
            navigation_timeout: Duration::from_secs(30),
            refresh: RefreshTiming::default(),
            name_entry_timeout: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(15),
            admission_timeout: Duration::from_secs(20),
            retry_delay: Duration::from_secs(5),
            retry_step: Duration::from_secs(2),
            retry_jitter: Duration::from_millis(1500),
            step_settle: (Duration::from_secs(1), Duration::from_secs(3)),
            keystroke_delay: (Duration::from_millis(50), Duration::from_millis(150)),
            guest_name: format!("Agent-{tag}"),
        }
    }
}

/// One live join attempt with its recorded transition trace.
#[derive(Debug)]
pub struct JoinAttempt {
    pub attempt_index: u32,
    pub refreshes_used: u32,
    trace: Vec<JoinState>,
    outcome: JoinOutcome,
}

impl JoinAttempt {
    pub fn new(attempt_index: u32) -> Self {
        Self {
            attempt_index,
            refreshes_used: 0,
            trace: Vec::new(),
            outcome: JoinOutcome::Pending,
        }
    }

    pub fn outcome(&self) -> &JoinOutcome {
        &self.outcome
    }

    /// Every state this attempt passed through, in order.
    pub fn trace(&self) -> &[JoinState] {
        &self.trace
    }

    fn enter(&mut self, state: JoinState) {
        debug_assert!(
            self.outcome == JoinOutcome::Pending,
            "no transitions after a terminal outcome"
        );
        self.trace.push(state);
    }

    fn complete(&mut self, outcome: JoinOutcome) {
        if self.outcome != JoinOutcome::Pending {
            return;
        }
        match &outcome {
            JoinOutcome::Connected => self.enter(JoinState::Connected),
            JoinOutcome::Failed(reason) => self.enter(JoinState::Failed(reason.clone())),
            JoinOutcome::Pending => {}
        }
        self.outcome = outcome;
    }

    /// Drive the attempt to a terminal outcome.
    pub async fn run(
        &mut self,
        driver: &dyn Driver,
        profile: &LocatorProfile,
        cfg: &JoinConfig,
        target_url: &str,
        events: &Broadcaster,
    ) -> JoinOutcome {
        let outcome = match self.drive(driver, profile, cfg, target_url, events).await {
            Ok(()) => JoinOutcome::Connected,
            Err(reason) => JoinOutcome::Failed(reason),
        };
        self.complete(outcome.clone());
        outcome
    }

    async fn drive(
        &mut self,
        driver: &dyn Driver,
        profile: &LocatorProfile,
        cfg: &JoinConfig,
        target_url: &str,
        events: &Broadcaster,
    ) -> Result<(), FailReason> {
        self.enter(JoinState::Navigating);
        events.status("navigating to the meeting link");
        match tokio::time::timeout(cfg.navigation_timeout, driver.navigate(target_url)).await {
            Ok(Ok(())) => {}
            // Partial loads sometimes pass verification, so both soft
            // failures fall through to the verification stage.
            Ok(Err(err)) => warn!("navigation reported failure: {}", err),
            Err(_) => warn!("navigation timed out, verifying the partial load"),
        }

        self.enter(JoinState::Verifying);
        events.info("checking that the meeting page loaded");
        let mut verification =
            verify::verify(driver, profile, cfg.verification_threshold, cfg.verification_settle)
                .await;

        while !verification.passed {
            if self.refreshes_used >= cfg.max_refreshes {
                return Err(FailReason::LoadVerificationExhausted);
            }
            let index = self.refreshes_used + 1;
            self.refreshes_used = index;
            self.enter(JoinState::Refreshing(index));

            let strategy = RefreshStrategy::select(index);
            events.status(format!(
                "refreshing page {}/{} ({})",
                index,
                cfg.max_refreshes,
                strategy.name()
            ));

            if refresh::refresh(driver, target_url, strategy, &cfg.refresh).await {
                self.enter(JoinState::Verifying);
                events.info("re-checking the meeting page");
                verification = verify::verify(
                    driver,
                    profile,
                    cfg.verification_threshold,
                    cfg.verification_settle,
                )
                .await;
                if verification.passed {
                    events.status("meeting page loaded after refresh");
                    break;
                }
            }

            if self.refreshes_used < cfg.max_refreshes {
                jittered_sleep(cfg.refresh.settle.0, cfg.refresh.settle.1).await;
            }
        }

        // Overlays appear staggered, so the sweep runs again after the
        // media controls are handled.
        self.enter(JoinState::PopupHandling);
        popups::dismiss(driver, &profile.entry_popups, cfg.step_settle, events)
            .await
            .map_err(driver_failure)?;

        self.enter(JoinState::PreparingControls);
        match driver.evaluate(&profile.media_mute_script()).await {
            Ok(value) => {
                let clicked = value.as_u64().unwrap_or(0);
                events.status(format!(
                    "microphone and camera suppressed ({clicked} controls)"
                ));
            }
            // Proceeding unmuted is a soft preference, not a requirement.
            Err(err) => warn!("could not suppress media controls: {}", err),
        }
        jittered_sleep(cfg.step_settle.0, cfg.step_settle.1).await;
        popups::dismiss(driver, &profile.overlay_popups, cfg.step_settle, events)
            .await
            .map_err(driver_failure)?;

        self.enter(JoinState::AwaitingNameEntry);
        match driver
            .wait_for_element(&profile.name_input, cfg.name_entry_timeout)
            .await
        {
            Ok(()) => {
                self.enter_guest_name(driver, profile, cfg).await?;
                events.status(format!("guest name set to {}", cfg.guest_name));
            }
            Err(err) if err.is_absence() => {
                events.warning("name field not found, trying to join directly");
            }
            Err(err) => return Err(driver_failure(err)),
        }

        self.enter(JoinState::Submitting);
        match driver
            .wait_for_element(&profile.join_control, cfg.submit_timeout)
            .await
        {
            Ok(()) => match driver.click(&profile.join_control).await {
                Ok(()) => {}
                Err(err) if err.is_absence() => {
                    return Err(FailReason::AdmissionTimeoutOrControlMissing)
                }
                Err(err) => return Err(driver_failure(err)),
            },
            Err(err) if err.is_absence() => {
                return Err(FailReason::AdmissionTimeoutOrControlMissing)
            }
            Err(err) => return Err(driver_failure(err)),
        }

        self.enter(JoinState::ConfirmingConnected);
        events.status("join requested, waiting for admission");
        match driver
            .wait_for_element(&profile.leave_control, cfg.admission_timeout)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_absence() => Err(FailReason::AdmissionTimeoutOrControlMissing),
            Err(err) => Err(driver_failure(err)),
        }
    }

    /// Character-paced text entry with randomized inter-keystroke delay.
    async fn enter_guest_name(
        &self,
        driver: &dyn Driver,
        profile: &LocatorProfile,
        cfg: &JoinConfig,
    ) -> Result<(), FailReason> {
        driver
            .click(&profile.name_input)
            .await
            .map_err(driver_failure)?;
        jittered_sleep(cfg.step_settle.0, cfg.step_settle.1).await;

        let mut buf = [0u8; 4];
        for ch in cfg.guest_name.chars() {
            driver
                .type_text(&profile.name_input, ch.encode_utf8(&mut buf))
                .await
                .map_err(driver_failure)?;
            jittered_sleep(cfg.keystroke_delay.0, cfg.keystroke_delay.1).await;
        }
        Ok(())
    }
}

fn driver_failure(err: DriverError) -> FailReason {
    FailReason::Driver(err.to_string())
}

/// Attempt history of one join run.
#[derive(Debug)]
pub struct JoinReport {
    pub attempts: Vec<JoinAttempt>,
    pub connected: bool,
}

/// Run whole join attempts until one connects or retries are exhausted.
///
/// Failed attempts leave a debug screenshot in `diagnostics_dir` (a failure
/// to capture one is itself non-fatal).
pub async fn join_with_retries(
    driver: &dyn Driver,
    profile: &LocatorProfile,
    cfg: &JoinConfig,
    target_url: &str,
    events: &Broadcaster,
    diagnostics_dir: &Path,
) -> JoinReport {
    let mut attempts = Vec::new();

    for index in 1..=cfg.max_retries {
        events.status(format!("connection attempt {}/{}", index, cfg.max_retries));

        let mut attempt = JoinAttempt::new(index);
        let outcome = attempt
            .run(driver, profile, cfg, target_url, events)
            .await;

        if let JoinOutcome::Failed(reason) = &outcome {
            events.error(format!("attempt {} failed: {}", index, reason));
            capture_failure_screenshot(driver, diagnostics_dir, events).await;
        }

        let connected = outcome == JoinOutcome::Connected;
        attempts.push(attempt);

        if connected {
            events.success("connected to the meeting");
            return JoinReport {
                attempts,
                connected: true,
            };
        }

        if index < cfg.max_retries {
            let backoff = cfg.retry_delay + cfg.retry_step * index + jitter(cfg.retry_jitter);
            tokio::time::sleep(backoff).await;
        }
    }

    events.error(format!(
        "failed to connect after {} attempts",
        cfg.max_retries
    ));
    JoinReport {
        attempts,
        connected: false,
    }
}

async fn capture_failure_screenshot(driver: &dyn Driver, dir: &Path, events: &Broadcaster) {
    let path = dir.join(format!(
        "failure_screenshot_{}.png",
        chrono::Utc::now().timestamp_millis()
    ));
    match driver.screenshot(&path).await {
        Ok(()) => events.warning(format!("failure screenshot saved to {}", path.display())),
        Err(err) => warn!("could not capture a failure screenshot: {}", err),
    }
}

/// Random duration in `[0, max]`.
pub(crate) fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

/// Sleep a random duration in `[min, max]`.
pub(crate) async fn jittered_sleep(min: Duration, max: Duration) {
    let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
    if hi == 0 {
        return;
    }
    let millis = rand::thread_rng().gen_range(lo..=hi.max(lo));
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
