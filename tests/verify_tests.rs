// Verification engine: threshold behavior and fail-closed checks.

mod common;

use common::ScriptedDriver;
use meet_scribe::join::verify::{tally, verify, DEFAULT_THRESHOLD};
use meet_scribe::join::LocatorProfile;
use std::time::Duration;

#[test]
fn below_threshold_fails() {
    let result = tally(&[true, true, false, false, false], DEFAULT_THRESHOLD);
    assert_eq!(result.checks_run, 5);
    assert_eq!(result.checks_passed, 2);
    assert!(!result.passed);
}

#[test]
fn exactly_at_threshold_passes() {
    // 3/5 is exactly the 60% boundary.
    let result = tally(&[true, true, true, false, false], DEFAULT_THRESHOLD);
    assert_eq!(result.checks_passed, 3);
    assert!(result.passed);
}

#[test]
fn unanimity_is_not_required() {
    let result = tally(&[true, true, true, true, false], DEFAULT_THRESHOLD);
    assert!(result.passed);
}

#[test]
fn all_passing_passes() {
    let result = tally(&[true; 5], DEFAULT_THRESHOLD);
    assert!(result.passed);
    assert_eq!(result.checks_passed, 5);
}

#[test]
fn no_checks_means_no_pass() {
    let result = tally(&[], DEFAULT_THRESHOLD);
    assert!(!result.passed);
}

#[test]
fn threshold_sweep_over_subsets() {
    // For every subset size, passing iff passed/run >= 0.6.
    for passed_count in 0..=5usize {
        let mut results = vec![true; passed_count];
        results.resize(5, false);
        let result = tally(&results, DEFAULT_THRESHOLD);
        let expected = (passed_count as f64) / 5.0 >= DEFAULT_THRESHOLD;
        assert_eq!(
            result.passed, expected,
            "{passed_count}/5 checks passed, expected passed={expected}"
        );
    }
}

#[tokio::test]
async fn full_battery_runs_five_checks() {
    let driver = ScriptedDriver::new(&[], vec![true]);
    let profile = LocatorProfile::google_meet();

    let result = verify(&driver, &profile, DEFAULT_THRESHOLD, Duration::ZERO).await;

    assert_eq!(result.checks_run, 5);
    assert_eq!(result.checks_passed, 5);
    assert!(result.passed);
}

#[tokio::test]
async fn checks_fail_closed_on_driver_errors() {
    // A check that cannot execute must never count as a pass.
    let mut driver = ScriptedDriver::new(&[], vec![true]);
    driver.fail_evaluates = true;
    let profile = LocatorProfile::google_meet();

    let result = verify(&driver, &profile, DEFAULT_THRESHOLD, Duration::ZERO).await;

    assert_eq!(result.checks_run, 5);
    assert_eq!(result.checks_passed, 0);
    assert!(!result.passed);
}
