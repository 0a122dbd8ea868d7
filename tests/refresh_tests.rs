// Refresh strategy selection is a pure function of the refresh index.

use meet_scribe::join::refresh::STRATEGIES;
use meet_scribe::join::RefreshStrategy;

#[test]
fn selection_cycles_through_all_strategies() {
    let expected = [
        RefreshStrategy::SoftReload,
        RefreshStrategy::HardNavigation,
        RefreshStrategy::CacheBypass,
        RefreshStrategy::FreshContext,
        RefreshStrategy::SoftReload,
        RefreshStrategy::HardNavigation,
        RefreshStrategy::CacheBypass,
        RefreshStrategy::FreshContext,
    ];

    for (index, expected_strategy) in expected.iter().enumerate() {
        let k = index as u32 + 1;
        assert_eq!(
            RefreshStrategy::select(k),
            *expected_strategy,
            "strategy for refresh {k}"
        );
    }
}

#[test]
fn strategies_escalate_in_invasiveness() {
    assert_eq!(STRATEGIES.len(), 4);
    assert_eq!(STRATEGIES[0], RefreshStrategy::SoftReload);
    assert_eq!(STRATEGIES[3], RefreshStrategy::FreshContext);
}

#[test]
fn strategy_names_are_stable() {
    let names: Vec<&str> = STRATEGIES.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec!["soft_reload", "hard_navigation", "cache_bypass", "fresh_context"]
    );
}
