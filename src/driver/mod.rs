//! Controllable-page abstraction
//!
//! The join state machine only ever talks to a [`Driver`]: navigate, wait
//! for an element, click, evaluate a script, screenshot. The production
//! implementation drives Chrome over the DevTools Protocol; tests substitute
//! a scripted double.

mod chrome;

pub use chrome::{ChromeDriver, ChromeOptions};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Errors surfaced by driver operations.
///
/// Callers that are best-effort (popup dismissal, name entry) swallow the
/// absence cases and propagate only genuine protocol failures.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("driver protocol failure: {0}")]
    Protocol(String),
}

impl DriverError {
    /// True for the absent-element outcomes (missing node, wait timeout)
    /// that best-effort callers treat as "nothing to do".
    pub fn is_absence(&self) -> bool {
        matches!(self, DriverError::NotFound(_) | DriverError::Timeout(_))
    }
}

/// How to find an element on the page.
///
/// The fragile application-specific matching rules live in a
/// [`LocatorProfile`](crate::join::LocatorProfile); the driver only knows
/// how to resolve these two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector, possibly a comma-joined fallback chain.
    Css(String),

    /// Element of `tag` whose text content contains any of the needles.
    /// Used for controls matched across localized label variants.
    Text { tag: String, needles: Vec<String> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(tag: impl Into<String>, needles: &[&str]) -> Self {
        Locator::Text {
            tag: tag.into(),
            needles: needles.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// XPath form of a text locator; `None` for CSS locators.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Locator::Css(_) => None,
            Locator::Text { tag, needles } => {
                let clauses: Vec<String> = needles
                    .iter()
                    .map(|needle| format!("contains(., \"{}\")", needle))
                    .collect();
                Some(format!("//{}[{}]", tag, clauses.join(" or ")))
            }
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css:{}", selector),
            Locator::Text { tag, needles } => write!(f, "text:{}:{}", tag, needles.join("|")),
        }
    }
}

/// Abstraction over a controllable browser-like page.
///
/// All operations take `&self`; the page is exclusively owned by one
/// session, and only the verification engine issues concurrent (read-only)
/// calls.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the page to `url`, waiting for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Reload the current document.
    async fn reload(&self) -> Result<(), DriverError>;

    /// Wait until `locator` resolves to an element, up to `timeout`.
    async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Click the first element matching `locator`.
    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Focus the element matching `locator` and type `text` into it.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Write a full-page screenshot to `path`.
    async fn screenshot(&self, path: &Path) -> Result<(), DriverError>;

    /// Release the underlying page/browser resources.
    async fn close(&self) -> Result<(), DriverError>;
}
