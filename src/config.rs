use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, sourced from environment variables with defaults.
///
/// Every knob is optional: `MEET_SCRIBE_LISTEN_PORT=8080 meet-scribe serve`
/// overrides the listen port, and so on for the other fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Recording length for the single-shot CLI, in seconds.
    pub recording_duration_secs: u64,

    /// Endpoint receiving the finished artifact as a multipart upload.
    pub upload_endpoint: String,

    /// Port for the HTTP control server.
    pub listen_port: u16,

    /// Directory for recordings and failure screenshots, created if absent.
    pub recordings_dir: PathBuf,

    /// Meeting links must start with this prefix to be accepted.
    pub allowed_url_prefix: String,

    /// Explicit browser executable; auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Run the browser without a visible window.
    pub headless: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("recording_duration_secs", 3600i64)?
            .set_default("upload_endpoint", "http://127.0.0.1:8000/process_audio/")?
            .set_default("listen_port", 3000i64)?
            .set_default("recordings_dir", "recordings")?
            .set_default("allowed_url_prefix", "https://meet.google.com/")?
            .set_default("headless", true)?
            .add_source(config::Environment::with_prefix("MEET_SCRIBE").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn recording_duration(&self) -> Duration {
        Duration::from_secs(self.recording_duration_secs)
    }
}
