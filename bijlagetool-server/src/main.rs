use std::time::Duration;

use anyhow::Context;
use bijlagetool_server::audit::spawn_audit_log;
use bijlagetool_server::cli::Cli;
use bijlagetool_server::sessions::spawn_sweeper;
use bijlagetool_server::{app, AppState};
use bridge_traits::time::LogLevel;
use clap::Parser;
use core_runtime::events::EventSeverity;
use core_runtime::logging::init_logging;
use core_runtime::{AppConfig, ClientConfig};
use core_service::CoreService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logging())?;

    let mut client = ClientConfig::from_file(&cli.client_secrets)
        .with_context(|| format!("loading {}", cli.client_secrets.display()))?;
    if let Some(redirect_uri) = cli.redirect_uri.as_deref() {
        client = client.with_redirect_uri(redirect_uri)?;
    }
    info!(
        client_id = %client.client_id,
        redirect_uri = %client.redirect_uri,
        "Loaded client configuration"
    );

    let config = AppConfig::builder()
        .client(client)
        .request_timeout(cli.request_timeout())
        .session_idle_timeout(cli.session_idle_timeout())
        .build()?;

    let service = CoreService::new(config);
    let state = AppState::new(service.clone()).with_max_sessions(cli.max_sessions);
    if !state.secure_cookies {
        warn!("Redirect URI is not https; session cookies are sent without the Secure flag");
    }

    let audit_level = match cli.log_level {
        LogLevel::Trace | LogLevel::Debug => EventSeverity::Debug,
        _ => EventSeverity::Info,
    };
    let _audit = spawn_audit_log(service.event_bus(), audit_level);
    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(state.sessions.clone(), SWEEP_INTERVAL, shutdown.clone());

    let addr = cli.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Bijlagetool listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    sweeper.await?;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
