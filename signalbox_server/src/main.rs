use anyhow::Context;
use clap::Parser;
use signalbox_server::{Args, SignalingServer};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("signalbox_server=info")),
        )
        .init();

    let args = Args::parse();
    let config = args.config();
    let path = config.path.clone();
    let server = SignalingServer::new(config).context("invalid configuration")?;

    let listener = TcpListener::bind(args.host)
        .await
        .with_context(|| format!("failed to bind {}", args.host))?;
    info!("Server listening on {}{}", args.host, path);

    server
        .serve(listener, shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
