use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vehicle_analytics::server::config::DashboardConfig;
use vehicle_analytics::server::dashboard::DashboardController;
use vehicle_analytics::services::upstream::HttpUpstream;
use vehicle_analytics::web::create_axum_router;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "vehicle-analytics.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Config comes first so the log directory is known; errors here go to stderr.
    let config = match DashboardConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, upstream = %config.upstream_url, "Starting vehicle analytics service.");

    let upstream = Arc::new(HttpUpstream::new(
        &config.upstream_url,
        config.camera_id,
        config.request_timeout(),
    )?);

    let dashboard = Arc::new(DashboardController::new(
        upstream.clone(),
        upstream,
        config.summary_options(),
    ));

    // Initial load; the service still starts when the upstream is down.
    if let Err(e) = dashboard.refresh_events().await {
        warn!(error = %e, "Initial event load failed. Serving empty views until a refresh succeeds.");
    }

    let refresh_task = config
        .refresh_interval()
        .map(|period| dashboard.spawn_periodic_refresh(period));

    let app = create_axum_router(dashboard);
    let listener = match tokio::net::TcpListener::bind(config.listen_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %config.listen_address, error = %e, "Failed to bind HTTP listener.");
            return Err(e.into());
        }
    };
    info!(address = %config.listen_address, "HTTP server listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await?;

    if let Some(task) = refresh_task {
        task.abort();
    }
    info!("Server stopped.");
    Ok(())
}
