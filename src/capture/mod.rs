//! Audio capture subprocess lifecycle
//!
//! One ffmpeg process records the system audio sink while the meeting is
//! live. The supervisor owns exactly one capture at a time: `start` spawns
//! the encoder and returns immediately; `stop` asks it to quit over stdin
//! and waits for the exit event, so the container trailer is written and
//! the file stays playable. A forced kill is never used on the happy path
//! because it truncates the artifact.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopping,
    Stopped,
}

/// A live capture: the encoder process plus its output path.
pub struct CaptureSession {
    pub file_path: PathBuf,
    pub started_at: DateTime<Utc>,
    child: Child,
}

/// Owns the lifecycle of one audio-capture subprocess.
pub struct CaptureSupervisor {
    program: PathBuf,
    /// Fixed argument override for tests; platform arguments otherwise.
    args_override: Option<Vec<String>>,
    session: Option<CaptureSession>,
    state: CaptureState,
}

impl CaptureSupervisor {
    /// Supervisor for the system ffmpeg. Fails when no encoder is on PATH,
    /// which the caller treats as a capture setup failure.
    pub fn new() -> Result<Self> {
        let program = which::which("ffmpeg").context("ffmpeg not found on PATH")?;
        Ok(Self {
            program,
            args_override: None,
            session: None,
            state: CaptureState::Idle,
        })
    }

    /// Supervisor over an arbitrary command; used by tests to substitute a
    /// controllable subprocess for the encoder.
    pub fn with_command(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args_override: Some(args),
            session: None,
            state: CaptureState::Idle,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Spawn the encoder writing to `path` and return immediately.
    pub fn start(&mut self, path: &Path) -> Result<()> {
        if self.session.is_some() {
            bail!("a capture is already active");
        }

        let args = match &self.args_override {
            Some(args) => args.clone(),
            None => platform_encoder_args(path),
        };

        info!("starting audio capture into {}", path.display());
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        // Encoder stderr is diagnostics only; it never drives control flow.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "encoder", "{}", line);
                }
            });
        }

        self.session = Some(CaptureSession {
            file_path: path.to_path_buf(),
            started_at: Utc::now(),
            child,
        });
        self.state = CaptureState::Recording;
        Ok(())
    }

    /// Gracefully stop the encoder and wait for it to exit.
    ///
    /// Resolves only after the subprocess is gone, which guarantees the
    /// output container is finalized. Idempotent: a no-op when nothing is
    /// recording.
    pub async fn stop(&mut self) -> Result<Option<PathBuf>> {
        let Some(mut session) = self.session.take() else {
            debug!("capture stop requested with no active session");
            return Ok(None);
        };

        self.state = CaptureState::Stopping;
        info!("sending quit to the encoder");

        if let Some(mut stdin) = session.child.stdin.take() {
            // 'q' is ffmpeg's graceful-quit command; errors only mean the
            // process already exited on its own.
            if let Err(err) = stdin.write_all(b"q").await {
                warn!("could not write quit command: {}", err);
            }
            if let Err(err) = stdin.shutdown().await {
                warn!("could not close encoder stdin: {}", err);
            }
        }

        let status = session
            .child
            .wait()
            .await
            .context("failed waiting for encoder exit")?;
        self.state = CaptureState::Stopped;
        info!("encoder exited with {}", status);

        Ok(Some(session.file_path))
    }
}

/// OS-dependent encoder arguments selecting the platform audio source.
#[cfg(target_os = "linux")]
fn platform_encoder_args(output: &Path) -> Vec<String> {
    vec![
        "-f".into(),
        "pulse".into(),
        "-i".into(),
        "virtual_sink.monitor".into(),
        "-acodec".into(),
        "libmp3lame".into(),
        "-q:a".into(),
        "2".into(),
        output.display().to_string(),
    ]
}

#[cfg(target_os = "windows")]
fn platform_encoder_args(output: &Path) -> Vec<String> {
    vec![
        "-f".into(),
        "dshow".into(),
        "-i".into(),
        "audio=Stereo Mix (Realtek(R) Audio)".into(),
        "-acodec".into(),
        "libmp3lame".into(),
        "-q:a".into(),
        "2".into(),
        output.display().to_string(),
    ]
}

#[cfg(target_os = "macos")]
fn platform_encoder_args(output: &Path) -> Vec<String> {
    vec![
        "-f".into(),
        "avfoundation".into(),
        "-i".into(),
        ":1".into(),
        "-acodec".into(),
        "libmp3lame".into(),
        output.display().to_string(),
    ]
}

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
fn platform_encoder_args(output: &Path) -> Vec<String> {
    vec![output.display().to_string()]
}
