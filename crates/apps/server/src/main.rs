use std::process::ExitCode;

use catalog::JsonFileFilterSetStore;
use server::config::ServerConfig;
use server::dataset::Dataset;
use server::{router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = ServerConfig::from_env()?;
    let filter_sets = JsonFileFilterSetStore::open(&config.filters_path)
        .map_err(|e| format!("opening {}: {e}", config.filters_path.display()))?;
    let http = reqwest::Client::builder()
        .user_agent("buildings-server/0.1")
        .build()
        .map_err(|e| format!("http client: {e}"))?;
    let dataset = Dataset::from_config(http, &config);

    let app = router(
        AppState::new(dataset, filter_sets),
        config.cors_origin.as_deref(),
    );
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| format!("binding {}: {e}", config.addr))?;
    info!("listening on http://{}", config.addr);
    info!(upstream = %config.upstream_url, land_use = %config.land_use_url, "data sources");
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {e}"))
}
