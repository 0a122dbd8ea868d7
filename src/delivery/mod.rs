//! Artifact delivery
//!
//! Upload runs in a separate OS process so the recording session can tear
//! down without waiting on a slow or unreachable backend. The orchestrator
//! re-execs this binary in worker mode, detached, and drops the handle;
//! from that moment the worker owns the job outright. Delivery failure is
//! never escalated back: the worker is the last stage and has no one
//! upstream to report to.

use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// An upload job, owned exclusively by the worker process.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub file_path: PathBuf,
    pub attempts_remaining: u32,
    pub backoff_delay: Duration,
}

impl DeliveryJob {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self::with_schedule(file_path, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    pub fn with_schedule(
        file_path: impl Into<PathBuf>,
        attempts: u32,
        backoff_delay: Duration,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            attempts_remaining: attempts,
            backoff_delay,
        }
    }
}

/// What the worker did with a job. The worker process exits 0 either way;
/// exhausted delivery is abandoned, not escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub attempts_made: u32,
    pub delivered: bool,
}

/// Run a delivery job to completion.
///
/// A missing source file is terminal and consumes no attempts.
pub async fn run(mut job: DeliveryJob, endpoint: &str) -> DeliveryOutcome {
    if !job.file_path.exists() {
        error!("source file {} does not exist", job.file_path.display());
        return DeliveryOutcome {
            attempts_made: 0,
            delivered: false,
        };
    }

    let client = reqwest::Client::new();
    let mut attempts_made = 0;

    while job.attempts_remaining > 0 {
        attempts_made += 1;
        job.attempts_remaining -= 1;
        info!(
            "upload attempt {} for {}",
            attempts_made,
            job.file_path.display()
        );

        match upload(&client, &job.file_path, endpoint).await {
            Ok(()) => {
                info!("upload of {} succeeded", job.file_path.display());
                return DeliveryOutcome {
                    attempts_made,
                    delivered: true,
                };
            }
            Err(err) => {
                error!("upload attempt {} failed: {:#}", attempts_made, err);
                if job.attempts_remaining > 0 {
                    info!("next attempt in {:?}", job.backoff_delay);
                    tokio::time::sleep(job.backoff_delay).await;
                }
            }
        }
    }

    error!(
        "all upload attempts for {} failed, abandoning delivery",
        job.file_path.display()
    );
    DeliveryOutcome {
        attempts_made,
        delivered: false,
    }
}

/// Stream the file as a single multipart field. Only HTTP success/failure
/// matters; no response schema is parsed.
async fn upload(client: &reqwest::Client, path: &Path, endpoint: &str) -> Result<()> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("audio")
        .to_string();

    let part = Part::stream(Body::wrap_stream(ReaderStream::new(file)))
        .file_name(file_name)
        .mime_str("audio/mpeg")?;
    let form = Form::new().part("audio_file", part);

    let response = client
        .post(endpoint)
        .multipart(form)
        .send()
        .await
        .context("upload request failed")?;

    let status = response.status();
    if !status.is_success() {
        bail!("upload rejected with status {status}");
    }
    Ok(())
}

/// Hand a finished artifact to a detached worker process and release it.
///
/// The worker is placed in its own process group with null stdio, so it
/// outlives the parent; no handle or cancellation token crosses the
/// boundary.
pub fn spawn_detached_worker(file_path: &Path) -> Result<()> {
    let exe = std::env::current_exe().context("failed to resolve current executable")?;

    let mut command = std::process::Command::new(exe);
    command
        .arg("deliver")
        .arg(file_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        // DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP
        command.creation_flags(0x0000_0008 | 0x0000_0200);
    }

    // Dropping the child handle is the release: the worker now owns the job.
    command
        .spawn()
        .context("failed to spawn the delivery worker")?;

    info!("delivery worker spawned for {}", file_path.display());
    Ok(())
}
