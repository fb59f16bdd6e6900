// ARR Rollforward Dashboard - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use arr_dashboard::api::{router, AppState};
use arr_dashboard::config::ServerSettings;
use arr_dashboard::logging::setup_logging;
use arr_dashboard::DataSnapshot;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = ServerSettings::parse();
    setup_logging(&settings.data.log_level)?;

    let data = DataSnapshot::load_dir(&settings.data.data_dir).with_context(|| {
        format!("Failed to load data from {}", settings.data.data_dir.display())
    })?;
    info!(fingerprint = %data.fingerprint, "data snapshot ready");

    let app = router(AppState::new(data), &settings.web_dir);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;

    info!(addr = %settings.bind, "🚀 server running");
    info!("   API: http://{}/api/kpis", settings.bind);
    info!("   UI:  http://{}/", settings.bind);

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
