// crates/server/src/main.rs
//! Timelapse server binary.
//!
//! Loads the notification/storage config, starts the HTTP + WebSocket
//! server and runs until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rtsp_timelapse_core::{Config, TimelapseService};
use rtsp_timelapse_server::{create_app, init_metrics, AppState};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default port for the server.
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Parser)]
#[command(name = "rtsp-timelapse", version, about = "Capture timelapse videos from RTSP streams")]
struct Args {
    /// JSON config with notification targets and storage paths.
    #[arg(long, env = "TIMELAPSE_CONFIG", default_value = "/app/config.json")]
    config: PathBuf,

    #[arg(long, env = "TIMELAPSE_HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,

    #[arg(long, env = "TIMELAPSE_PORT")]
    port: Option<u16>,

    /// Directory with the built UI, served at `/`.
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long, env = "TIMELAPSE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Args {
    /// `--port`, then `PORT`, then the default.
    fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }
}

/// Install the fmt subscriber, plus a non-blocking file writer when asked.
/// The returned guard must live as long as the process to flush the file.
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,rtsp_timelapse_core=info,rtsp_timelapse_server=info,tower_http=warn".into()
    });

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .context("--log-file must name a file")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_file.as_ref())?;

    init_metrics();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    tracing::info!(
        notification_targets = config.notifications.len(),
        snapshot_root = %config.snapshot_root.display(),
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    let state = AppState::new(TimelapseService::from_config(config));
    let app = create_app(state, args.static_dir.clone());

    let addr = SocketAddr::new(args.host, args.port());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Timelapse server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
