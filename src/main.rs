#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

mod api;
mod challenge;
mod claim;
mod commitment;
mod config;
mod errors;
mod key_directory;
mod key_types;
mod supervisor;
mod token;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::VerifierConfig;
use errors::*;

#[rocket::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e.render(), "claim verifier stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let figment = rocket::Config::figment();
    let config = VerifierConfig::from_figment(&figment)?;

    info!(
        claim_type = %config.claim_type,
        key_directory = %config.key_directory_url,
        token_lifetime_secs = config.token_lifetime_secs,
        key_fetch_timeout_secs = config.key_fetch_timeout_secs,
        "starting claim verifier"
    );

    // Generate a nonce to force random generator to be initialized
    key_types::nonce()?;

    supervisor::supervise(&config.restart_policy(), move || {
        let figment = figment.clone();
        async move {
            api::setup_rocket(figment)?
                .launch()
                .await
                .map_err(|e| ErrorKind::Launch(e.to_string()))?;
            Ok::<(), Error>(())
        }
    })
    .await
}
