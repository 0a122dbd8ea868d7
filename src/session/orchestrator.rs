use crate::broadcast::Broadcaster;
use crate::capture::CaptureSupervisor;
use crate::config::Config;
use crate::delivery;
use crate::driver::{ChromeDriver, ChromeOptions, Driver};
use crate::join::{self, JoinConfig, LocatorProfile};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Immutable description of one session, created at orchestration start.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub target_url: String,
    pub recording_duration: Duration,
    pub join: JoinConfig,
}

impl SessionRequest {
    pub fn new(target_url: impl Into<String>, recording_duration: Duration) -> Self {
        Self {
            target_url: target_url.into(),
            recording_duration,
            join: JoinConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct SessionSummary {
    /// The finished recording, when one was produced.
    pub artifact: Option<PathBuf>,

    pub join_attempts: usize,

    /// Whether the session ended on the stop signal rather than the timer.
    pub stopped_early: bool,
}

/// Drives one session end to end: join, capture, delivery handoff.
///
/// Holds the only driver and the only capture supervisor for the session,
/// which is what enforces the one-recording-at-a-time invariant.
pub struct SessionOrchestrator {
    request: SessionRequest,
    config: Config,
    events: Broadcaster,
}

impl SessionOrchestrator {
    pub fn new(request: SessionRequest, config: Config, events: Broadcaster) -> Self {
        Self {
            request,
            config,
            events,
        }
    }

    /// Run the session to completion.
    ///
    /// Every terminal state, success or failure, emits exactly one
    /// `finished` broadcast after best-effort teardown.
    pub async fn run(&self, stop_rx: watch::Receiver<bool>) -> Result<SessionSummary> {
        let result = self.drive(stop_rx).await;
        match &result {
            Ok(_) => self.events.finished("session complete"),
            Err(err) => {
                self.events.error(format!("session failed: {err:#}"));
                self.events.finished("session aborted");
            }
        }
        result
    }

    async fn drive(&self, mut stop_rx: watch::Receiver<bool>) -> Result<SessionSummary> {
        std::fs::create_dir_all(&self.config.recordings_dir)
            .context("could not create the recordings directory")?;

        let origin = origin_of(&self.request.target_url)?;
        self.events.status("launching browser");
        let chrome_options = ChromeOptions {
            executable: self.config.chrome_path.clone(),
            headless: self.config.headless,
            ..ChromeOptions::default()
        };
        let driver = ChromeDriver::launch(&chrome_options, &origin)
            .await
            .context("failed to launch the browser")?;

        let profile = LocatorProfile::google_meet();
        let report = join::join_with_retries(
            &driver,
            &profile,
            &self.request.join,
            &self.request.target_url,
            &self.events,
            &self.config.recordings_dir,
        )
        .await;

        if !report.connected {
            release_driver(&driver, &self.events).await;
            bail!(
                "could not join the meeting after {} attempts",
                report.attempts.len()
            );
        }

        let file_path = self.config.recordings_dir.join(format!(
            "meeting-{}.mp3",
            chrono::Utc::now().timestamp_millis()
        ));

        let mut capture = match CaptureSupervisor::new() {
            Ok(capture) => capture,
            Err(err) => {
                release_driver(&driver, &self.events).await;
                return Err(err.context("audio capture setup failed"));
            }
        };
        if let Err(err) = capture.start(&file_path) {
            release_driver(&driver, &self.events).await;
            return Err(err.context("could not start the audio capture"));
        }

        self.events.recording_started(
            "recording started",
            self.request.recording_duration.as_secs(),
        );

        let stopped_early = tokio::select! {
            _ = tokio::time::sleep(self.request.recording_duration) => {
                self.events.status("recording window elapsed");
                false
            }
            _ = wait_for_stop(&mut stop_rx) => {
                self.events.warning("manual stop requested");
                true
            }
        };

        // Teardown proceeds best-effort through every remaining resource.
        let artifact = match capture.stop().await {
            Ok(path) => {
                self.events.status("audio capture finalized");
                path
            }
            Err(err) => {
                warn!("capture shutdown failed: {}", err);
                None
            }
        };
        release_driver(&driver, &self.events).await;

        let artifact = artifact.filter(|path| path.exists());
        match &artifact {
            Some(path) => {
                self.events
                    .status(format!("file saved to {}", path.display()));
                delivery::spawn_detached_worker(path)
                    .context("could not hand the file to the delivery worker")?;
                self.events.status("delivery worker launched");
            }
            None => {
                self.events
                    .warning("no artifact was produced, skipping delivery");
            }
        }

        Ok(SessionSummary {
            artifact,
            join_attempts: report.attempts.len(),
            stopped_early,
        })
    }
}

/// Resolves when a stop is signaled; never resolves if the controller goes
/// away without signaling, letting the recording timer decide.
async fn wait_for_stop(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn release_driver(driver: &ChromeDriver, events: &Broadcaster) {
    match driver.close().await {
        Ok(()) => events.status("browser closed"),
        Err(err) => {
            warn!("could not close the browser cleanly: {}", err);
            events.warning(format!("could not close the browser cleanly: {err}"));
        }
    }
}

fn origin_of(target: &str) -> Result<String> {
    let url = url::Url::parse(target).context("invalid meeting URL")?;
    Ok(url.origin().ascii_serialization())
}
