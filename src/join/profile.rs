//! Application-specific element matching rules
//!
//! Everything tied to the current third-party conferencing UI lives in a
//! [`LocatorProfile`]: landmark selectors, popup signatures, localized
//! control labels. The state machine is written against the profile, so a
//! UI change means editing this file, not the join logic.

use super::popups::PopupSignature;
use crate::driver::Locator;

#[derive(Debug, Clone)]
pub struct LocatorProfile {
    pub name: &'static str,

    /// Substring the page URL must contain.
    pub url_fragment: &'static str,

    /// Lowercased substrings expected in the document title.
    pub title_fragments: &'static [&'static str],

    /// Selectors whose visible presence marks the page as usable.
    pub landmark_selectors: &'static [&'static str],

    /// Selector matching in-flight loading indicators.
    pub loading_indicator_selector: &'static str,

    /// Lowercased substrings of known error surfaces.
    pub error_patterns: &'static [&'static str],

    /// Lowercased aria-label fragments of the outgoing mic/camera toggles.
    pub media_control_labels: &'static [&'static str],

    /// Guest display-name field on the pre-join screen.
    pub name_input: Locator,

    /// Join / request-to-join control, matched across localized labels.
    pub join_control: Locator,

    /// In-session leave control; its appearance confirms admission.
    pub leave_control: Locator,

    /// Overlays seen right after navigation (consent, notifications).
    pub entry_popups: Vec<PopupSignature>,

    /// Overlays that appear later, around the pre-join controls.
    pub overlay_popups: Vec<PopupSignature>,
}

impl LocatorProfile {
    pub fn google_meet() -> Self {
        Self {
            name: "google-meet",
            url_fragment: "meet.google.com",
            title_fragments: &["meet", "google"],
            landmark_selectors: &[
                "[data-meeting-title]",
                "[jsname=\"r4nke\"]",
                "[role=\"main\"]",
                ".google-material-icons",
                "[data-call-to-action]",
                "input[placeholder*=\"name\"], input[aria-label*=\"name\"]",
                "[data-promo-anchor-id]",
                ".VfPpkd-LgbsSe",
            ],
            loading_indicator_selector: ".loading, .spinner, [aria-label*=\"loading\"]",
            error_patterns: &[
                "something went wrong",
                "unable to connect",
                "meeting not found",
                "invalid meeting",
                "meeting has ended",
                "failed to join",
                "network error",
                "impossible de se connecter",
                "réunion introuvable",
            ],
            media_control_labels: &["microphone", "micro", "camera", "caméra"],
            name_input: Locator::css(
                "input[placeholder*=\"Your name\"], input[placeholder*=\"name\"], \
                 input[aria-label*=\"name\"], input[aria-label*=\"nom\"]",
            ),
            join_control: Locator::text(
                "button",
                &["Join now", "Ask to join", "Participer", "Rejoindre", "Passer"],
            ),
            leave_control: Locator::css(
                "[data-call-to-action=\"leave\"], button[aria-label*=\"Leave call\"], \
                 button[aria-label*=\"Quitter\"]",
            ),
            entry_popups: vec![
                PopupSignature::new("sign-in prompt", Locator::text("button", &["OK", "Got it"])),
                PopupSignature::new("notifications", Locator::css("button[jsname=\"V67aGc\"]")),
            ],
            overlay_popups: vec![
                PopupSignature::new(
                    "device warning",
                    Locator::text("button", &["Dismiss", "Ignorer"]),
                ),
                PopupSignature::new("notifications", Locator::css("button[jsname=\"V67aGc\"]")),
            ],
        }
    }

    /// Script that clicks every actionable control whose label matches the
    /// outgoing mic/camera semantics; returns the number of controls clicked.
    pub fn media_mute_script(&self) -> String {
        let labels = serde_json::to_string(self.media_control_labels).unwrap_or_default();
        format!(
            r#"(() => {{
                const labels = {labels};
                let clicked = 0;
                document.querySelectorAll('[role="button"]').forEach((button) => {{
                    const label = (button.getAttribute('aria-label') || '').toLowerCase();
                    if (labels.some((fragment) => label.includes(fragment))) {{
                        button.click();
                        clicked += 1;
                    }}
                }});
                return clicked;
            }})()"#
        )
    }
}
