//! `s3proxy` binary entry point.
//!
//! Startup sequence:
//! 1. Parse CLI flags and load [`Config`] (defaults, `S3PROXY_*`, flags).
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Load the TLS certificate unless `--no-tls` is set.
//! 4. Fetch the KEK from the keyservice.
//! 5. Initialise the S3 client and the pass-through forwarder.
//! 6. Build the Axum router and run the listener until SIGINT/SIGTERM.

mod aws;
mod config;
mod crypto;
mod kek;
mod server;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use config::{Cli, Config};
use server::forward::Forwarder;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cli = Cli::parse();
    let cfg = Config::load(&cli).map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.log_filter(), cfg.otlp_endpoint.as_deref())?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        ip = %cfg.ip,
        port = cfg.port,
        region = %cfg.region,
        tls = !cfg.no_tls,
        allow_multipart = cfg.allow_multipart,
        "s3proxy starting"
    );

    // -----------------------------------------------------------------------
    // 3. TLS
    // -----------------------------------------------------------------------
    let tls = if cfg.no_tls {
        None
    } else {
        Some(server::tls::load_acceptor(&cfg.cert_path(), &cfg.key_path())?)
    };

    // -----------------------------------------------------------------------
    // 4. KEK
    // -----------------------------------------------------------------------
    let key_service = kek::GrpcKeyService::connect(&cfg.keyservice_endpoint)
        .await
        .context("connecting to keyservice")?;
    let kek = kek::fetch_kek(&key_service)
        .await
        .context("getting KEK")?;

    // -----------------------------------------------------------------------
    // 5. Upstream clients
    // -----------------------------------------------------------------------
    let aws = aws::AwsClients::init(&cfg.region).await;
    let store = Arc::new(aws::S3ObjectStore::new(aws.s3));
    let forwarder = Forwarder::new().context("building forwarding client")?;

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(kek, store, forwarder, cfg.allow_multipart);
    let router = server::router::build(state);

    let addr = cfg.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    server::listener::serve(listener, router, tls, shutdown).await?;

    telemetry::shutdown_telemetry();
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
    shutdown.cancel();
}
