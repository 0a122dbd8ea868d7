//! Multi-signal page verification
//!
//! No single signal reliably tells whether the conferencing page reached a
//! usable state, so five independent checks run concurrently and the result
//! is threshold-based. Checks are unreliable proxies, not ground truth:
//! passing means "enough of them agree", not unanimity. A check that cannot
//! execute counts as failed, never as passed.

use super::profile::LocatorProfile;
use crate::driver::Driver;
use std::time::Duration;
use tracing::{debug, info};

/// Minimum fraction of checks that must pass.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Outcome of one verification pass. Ephemeral; produced per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerificationResult {
    pub checks_run: usize,
    pub checks_passed: usize,
    pub passed: bool,
}

/// Fold raw check outcomes into a threshold decision.
///
/// Passing exactly at the boundary counts as a pass.
pub fn tally(results: &[bool], threshold: f64) -> VerificationResult {
    let checks_run = results.len();
    let checks_passed = results.iter().filter(|passed| **passed).count();
    let passed =
        checks_run > 0 && (checks_passed as f64) / (checks_run as f64) >= threshold;
    VerificationResult {
        checks_run,
        checks_passed,
        passed,
    }
}

/// Run the full check battery against the page.
///
/// Stateless and side-effect-free: every check is a read, and no retries
/// happen here. The settle delay guards against false negatives on pages
/// that are still rendering.
pub async fn verify(
    driver: &dyn Driver,
    profile: &LocatorProfile,
    threshold: f64,
    settle: Duration,
) -> VerificationResult {
    tokio::time::sleep(settle).await;

    let scripts = [
        landmark_script(profile),
        identity_script(profile),
        readiness_script(profile),
        error_free_script(profile),
        interactivity_script(),
    ];

    let results =
        futures::future::join_all(scripts.iter().map(|script| run_check(driver, script))).await;

    let result = tally(&results, threshold);
    info!(
        "page verification: {}/{} checks passed ({})",
        result.checks_passed,
        result.checks_run,
        if result.passed { "ok" } else { "failed" }
    );
    result
}

async fn run_check(driver: &dyn Driver, script: &str) -> bool {
    match driver.evaluate(script).await {
        Ok(value) => value.as_bool().unwrap_or(false),
        Err(err) => {
            // Fail closed: a check that cannot execute is not a pass.
            debug!("verification check errored: {}", err);
            false
        }
    }
}

/// (a) Visible presence of application UI landmarks.
fn landmark_script(profile: &LocatorProfile) -> String {
    let selectors = serde_json::to_string(profile.landmark_selectors).unwrap_or_default();
    format!(
        r#"(() => {{
            const selectors = {selectors};
            return selectors.some((selector) => {{
                const element = document.querySelector(selector);
                return element && element.offsetParent !== null;
            }});
        }})()"#
    )
}

/// (b) URL and title corroborate the expected application.
fn identity_script(profile: &LocatorProfile) -> String {
    let fragments = serde_json::to_string(profile.title_fragments).unwrap_or_default();
    let url_fragment = serde_json::to_string(profile.url_fragment).unwrap_or_default();
    format!(
        r#"(() => {{
            const fragments = {fragments};
            const title = document.title.toLowerCase();
            const titleOk = fragments.some((fragment) => title.includes(fragment));
            const urlOk = window.location.href.includes({url_fragment});
            return titleOk && urlOk;
        }})()"#
    )
}

/// (d) Document ready and no in-flight loading indicators.
fn readiness_script(profile: &LocatorProfile) -> String {
    let loading = serde_json::to_string(profile.loading_indicator_selector).unwrap_or_default();
    format!(
        r#"(() => {{
            const ready = document.readyState === 'complete';
            const forwardNavigation =
                !!window.performance && window.performance.navigation.type !== 2;
            const stillLoading = !!document.querySelector({loading});
            return ready && forwardNavigation && !stillLoading;
        }})()"#
    )
}

/// (c) Absence of known error-text patterns in the body or alert surfaces.
fn error_free_script(profile: &LocatorProfile) -> String {
    let patterns = serde_json::to_string(profile.error_patterns).unwrap_or_default();
    format!(
        r#"(() => {{
            const patterns = {patterns};
            const body = ((document.body && document.body.textContent) || '').toLowerCase();
            if (patterns.some((pattern) => body.includes(pattern))) return false;
            const alerts = document.querySelectorAll('[role="alert"], .error, .warning');
            return !Array.from(alerts).some((element) =>
                element.textContent &&
                patterns.some((pattern) =>
                    element.textContent.toLowerCase().includes(pattern)));
        }})()"#
    )
}

/// (e) Basic interactivity: the page exposes actionable controls.
fn interactivity_script() -> String {
    r#"document.querySelectorAll('button, input, [role="button"]').length > 0"#.to_string()
}
