// Scripted driver double shared by the join/verification tests.
//
// Element presence is keyed on locator substrings, and verification
// outcomes are scripted per pass: each verification pass consumes one
// entry and applies it to all five checks.

use async_trait::async_trait;
use meet_scribe::driver::{Driver, DriverError, Locator};
use meet_scribe::join::{JoinConfig, RefreshTiming};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const CHECKS_PER_PASS: usize = 5;

struct PassState {
    queued: VecDeque<bool>,
    current: Option<bool>,
    checks_left: usize,
    passes_started: usize,
}

pub struct ScriptedDriver {
    /// Locator-substring markers that resolve to an element.
    present: Vec<String>,
    /// When set, every evaluate fails with a protocol error.
    pub fail_evaluates: bool,
    passes: Mutex<PassState>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    pub fn new(present: &[&str], verification_passes: Vec<bool>) -> Self {
        Self {
            present: present.iter().map(|marker| marker.to_string()).collect(),
            fail_evaluates: false,
            passes: Mutex::new(PassState {
                queued: verification_passes.into(),
                current: None,
                checks_left: 0,
                passes_started: 0,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// How many verification passes the driver has served so far.
    pub fn verification_passes_started(&self) -> usize {
        self.passes.lock().unwrap().passes_started
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn is_present(&self, locator: &Locator) -> bool {
        let key = locator.to_string();
        self.present.iter().any(|marker| key.contains(marker.as_str()))
    }

    fn next_check_result(&self) -> bool {
        let mut state = self.passes.lock().unwrap();
        if state.current.is_none() || state.checks_left == 0 {
            let next = state.queued.pop_front().unwrap_or(false);
            state.current = Some(next);
            state.checks_left = CHECKS_PER_PASS;
            state.passes_started += 1;
        }
        state.checks_left -= 1;
        state.current.unwrap_or(false)
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.record("reload".to_string());
        Ok(())
    }

    async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        self.record(format!("wait:{locator}"));
        if self.is_present(locator) {
            Ok(())
        } else {
            Err(DriverError::Timeout(timeout))
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.record(format!("click:{locator}"));
        if self.is_present(locator) {
            Ok(())
        } else {
            Err(DriverError::NotFound(locator.to_string()))
        }
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        self.record(format!("type:{locator}:{text}"));
        if self.is_present(locator) {
            Ok(())
        } else {
            Err(DriverError::NotFound(locator.to_string()))
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        self.record("evaluate".to_string());
        if self.fail_evaluates {
            return Err(DriverError::Protocol("scripted failure".to_string()));
        }
        if script.contains("getAttribute('aria-label')") {
            // Media-mute sweep: pretend two controls were clicked.
            return Ok(json!(2));
        }
        if script.contains("location.reload") || script.contains("serviceWorker") {
            return Ok(Value::Null);
        }
        Ok(json!(self.next_check_result()))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        self.record(format!("screenshot:{}", path.display()));
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Join configuration with all waits collapsed so tests run fast.
pub fn fast_join_config() -> JoinConfig {
    JoinConfig {
        max_retries: 2,
        max_refreshes: 3,
        verification_settle: Duration::ZERO,
        navigation_timeout: Duration::from_secs(5),
        refresh: RefreshTiming {
            op_timeout: Duration::from_secs(5),
            reload_settle: Duration::ZERO,
            settle: (Duration::ZERO, Duration::ZERO),
        },
        name_entry_timeout: Duration::from_millis(10),
        submit_timeout: Duration::from_millis(10),
        admission_timeout: Duration::from_millis(10),
        retry_delay: Duration::ZERO,
        retry_step: Duration::ZERO,
        retry_jitter: Duration::ZERO,
        step_settle: (Duration::ZERO, Duration::ZERO),
        keystroke_delay: (Duration::ZERO, Duration::ZERO),
        guest_name: "Bot".to_string(),
        ..JoinConfig::default()
    }
}
