use std::time::Duration;

use anyhow::Result;
use tgstore_server::{build, build_backends, janitor, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let settings = Settings::new()?;
    let backends = build_backends(&settings)?;
    let app = build(&settings, backends).await?;

    let janitor = settings.local_files_dir.clone().map(|root| {
        tokio::spawn(janitor::run(
            root,
            Duration::from_secs(settings.janitor_interval_secs),
            Duration::from_secs(settings.janitor_max_age_secs),
        ))
    });

    app.listen_with_shutdown(settings.bind_addr.as_str(), shutdown_signal())
        .await?;

    if let Some(janitor) = janitor {
        janitor.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
