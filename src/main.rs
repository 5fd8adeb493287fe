use anyhow::Result;
use cinerec::config::Settings;
use cinerec::session::{Connector, Shell};
use cinerec::tmdb::{TmdbApi, TmdbClient};
use dotenvy::dotenv;
use std::io;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let dotenv_result = dotenv();
    init_tracing();
    match dotenv_result {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => debug!("No .env file loaded ({})", e),
    }

    let settings = Settings::from_env();
    let base_url = settings.base_url.clone();
    let connector: Connector = Box::new(move |key: String| {
        let client = TmdbClient::new(key, base_url.clone())?;
        Ok(Arc::new(client) as Arc<dyn TmdbApi>)
    });

    let stdin = io::stdin();
    let mut shell = Shell::new(stdin.lock(), io::stdout(), connector, settings.api_key);
    shell.run().await
}
