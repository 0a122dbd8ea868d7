//! Chrome-backed driver implementation
//!
//! Drives a headless Chrome/Chromium instance over the DevTools Protocol.
//! Launch hardening (automation-fingerprint suppression, fake media devices,
//! permission grants) lives here so the join logic stays driver-agnostic.

use super::{Driver, DriverError, Locator};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Rotated between launches so repeated sessions don't share a fingerprint.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Masks the most common automation tells before any page script runs.
const STEALTH_INIT_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => false });
    delete navigator.__proto__.webdriver;
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', length: 1 },
            { name: 'Chrome PDF Viewer', length: 1 },
            { name: 'Native Client', length: 1 }
        ],
    });
"#;

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// Explicit browser executable; common install names are probed when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Deadline applied to individual CDP requests.
    pub request_timeout: Duration,
    pub launch_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            window_size: (1920, 1080),
            request_timeout: Duration::from_secs(45),
            launch_timeout: Duration::from_secs(20),
        }
    }
}

/// A launched browser plus the single page this session drives.
pub struct ChromeDriver {
    browser: Mutex<Browser>,
    page: Page,
}

impl ChromeDriver {
    /// Launch a hardened browser instance and prepare a blank page.
    ///
    /// `origin` is the meeting origin granted media/notification permissions
    /// up front, so the conferencing UI never blocks on a permission prompt.
    pub async fn launch(options: &ChromeOptions, origin: &str) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(options.request_timeout)
            .launch_timeout(options.launch_timeout);

        if !options.headless {
            builder = builder.with_head();
        }

        let mut args: Vec<String> = vec![
            "--disable-blink-features=AutomationControlled".into(),
            "--disable-features=VizDisplayCompositor".into(),
            format!(
                "--window-size={},{}",
                options.window_size.0, options.window_size.1
            ),
            "--lang=en-US,en".into(),
            "--disable-dev-shm-usage".into(),
            "--no-first-run".into(),
            "--no-default-browser-check".into(),
            "--disable-background-timer-throttling".into(),
            "--disable-renderer-backgrounding".into(),
            "--disable-backgrounding-occluded-windows".into(),
            "--disable-extensions".into(),
            "--use-fake-ui-for-media-stream".into(),
            "--use-fake-device-for-media-stream".into(),
        ];
        if options.headless {
            args.push("--headless=new".into());
            args.push("--hide-scrollbars".into());
        }
        builder = builder.args(args);

        if let Some(executable) = Self::resolve_executable(options) {
            info!("using browser executable {}", executable.display());
            builder = builder.chrome_executable(executable);
        }

        let config = builder
            .build()
            .map_err(|err| anyhow::anyhow!("browser config error: {err}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        // The handler task pumps CDP events for the lifetime of the browser;
        // it ends on its own once the browser process exits.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("cdp handler event error: {}", err);
                }
            }
        });

        if let Err(err) = browser
            .execute(GrantPermissionsParams {
                permissions: vec![
                    PermissionType::AudioCapture,
                    PermissionType::VideoCapture,
                    PermissionType::Notifications,
                ],
                origin: Some(origin.to_string()),
                browser_context_id: None,
            })
            .await
        {
            warn!("could not grant media permissions for {}: {}", origin, err);
        }

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            STEALTH_INIT_SCRIPT,
        ))
        .await
        .context("failed to install init script")?;

        let user_agent = {
            let mut rng = rand::thread_rng();
            USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
        };
        page.set_user_agent(user_agent)
            .await
            .context("failed to set user agent")?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
        })
    }

    fn resolve_executable(options: &ChromeOptions) -> Option<PathBuf> {
        if let Some(path) = &options.executable {
            return Some(path.clone());
        }
        ["google-chrome", "google-chrome-stable", "chrome", "chromium", "chromium-browser"]
            .iter()
            .find_map(|name| which::which(name).ok())
    }

    async fn find(&self, locator: &Locator) -> Result<chromiumoxide::element::Element, DriverError> {
        match locator {
            Locator::Css(selector) => self
                .page
                .find_element(selector.as_str())
                .await
                .map_err(|err| DriverError::NotFound(format!("{selector}: {err}"))),
            Locator::Text { .. } => {
                let xpath = locator
                    .to_xpath()
                    .ok_or_else(|| DriverError::Protocol("locator has no xpath form".into()))?;
                self.page
                    .find_xpath(xpath.as_str())
                    .await
                    .map_err(|err| DriverError::NotFound(format!("{xpath}: {err}")))
            }
        }
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|err| DriverError::Navigation(err.to_string()))?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.page
            .reload()
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        Ok(())
    }

    async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find(locator).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(timeout));
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        element
            .click()
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        element
            .click()
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        element
            .type_str(text)
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        // `undefined` has no JSON form; report it as null.
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        self.page
            .save_screenshot(
                ScreenshotParams::builder().full_page(true).build(),
                path,
            )
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        let _ = browser.wait().await;
        Ok(())
    }
}
