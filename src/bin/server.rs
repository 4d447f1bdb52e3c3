use std::sync::Arc;

use anyhow::Result;
use payplan::config::Settings;
use payplan::handler::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Arc::new(Settings::from_env()?);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("payplan=info,tower_http=info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log_format {
        payplan::config::LogFormat::Json => subscriber.json().init(),
        payplan::config::LogFormat::Pretty => subscriber.init(),
    }

    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(AppState::new(settings));
    let app = router(state);

    tracing::info!(%bind_addr, "starting payplan server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
