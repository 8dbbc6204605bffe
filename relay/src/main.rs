use clap::Parser;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

use args::Args;

mod args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    telemetry::init(args.log_level.into(), args.log_style.into());

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::locate_default_config()?,
    };

    log::info!("loading configuration from {}", config_path.display());
    let resolved = config::load_resolved_config(&config_path).await?;

    let server_count = resolved.servers.len();
    let aggregator = aggregator::build(resolved).await?;
    log::info!("connected to downstream servers; {server_count} configured");

    let service = aggregator.clone().serve(stdio()).await?;

    tokio::select! {
        result = service.waiting() => {
            result?;
        }
        _ = shutdown_signal() => {
            log::info!("shutdown signal received, closing downstream connections");
        }
    }

    aggregator.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
