use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tandem::config::SyncConfig;
use tandem::domain::presence::Session;
use tandem::infra::http::HttpApi;
use tandem::SyncState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env()?;
    let api = Arc::new(HttpApi::new(&config)?);
    let state = SyncState::new(api, &config);

    let session = Session::new(
        config.session_user_id,
        config.session_display_name.clone(),
        config.session_token.clone(),
    );

    state.poller.start(&session);
    tracing::info!(user_id = %session.user_id, "sync engine running");

    shutdown_signal().await;
    state.poller.stop();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
