use anyhow::Result;
use clap::{Parser, Subcommand};
use meet_scribe::broadcast::{spawn_console_observer, Broadcaster};
use meet_scribe::delivery::{self, DeliveryJob};
use meet_scribe::session::{SessionHandle, SessionOrchestrator, SessionRequest};
use meet_scribe::{http, Config};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "meet-scribe", version, about = "Headless meeting audio recorder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join a meeting, record it, and hand the file to the upload worker
    Record {
        /// Meeting link to join
        meeting_url: String,

        /// Recording length in seconds (overrides the configured default)
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Run the HTTP control server
    Serve {
        /// Listen port (overrides the configured default)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Internal: detached upload worker entry point
    #[command(hide = true)]
    Deliver { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Record {
            meeting_url,
            duration_secs,
        } => {
            let duration = duration_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.recording_duration());

            let events = Broadcaster::new(64);
            spawn_console_observer(&events);

            // Ctrl-C stops the recording early instead of killing the
            // session mid-teardown.
            let (handle, stop_rx) = SessionHandle::new();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping the session");
                    handle.signal_stop();
                }
            });

            let request = SessionRequest::new(meeting_url, duration);
            let orchestrator = SessionOrchestrator::new(request, config, events);
            let summary = orchestrator.run(stop_rx).await?;
            info!(
                "session finished after {} join attempt(s)",
                summary.join_attempts
            );
            Ok(())
        }

        Command::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.listen_port = port;
            }
            http::serve(config).await
        }

        Command::Deliver { file } => {
            // Worker mode always exits 0: delivery failure is logged and
            // abandoned, there is no one upstream to report to.
            let outcome = delivery::run(DeliveryJob::new(file), &config.upload_endpoint).await;
            info!(
                "delivery worker done: {} attempt(s), delivered={}",
                outcome.attempts_made, outcome.delivered
            );
            Ok(())
        }
    }
}
