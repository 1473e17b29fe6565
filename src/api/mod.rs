use std::sync::Arc;

use rocket::figment::Figment;
use rocket::{catchers, routes, Build, Rocket};

use crate::challenge::ChallengeIssuer;
use crate::claim::ClaimVerifier;
use crate::config::VerifierConfig;
use crate::errors::*;
use crate::key_directory::{KeyDirectory, RemoteKeyDirectory};

pub mod cors;
pub mod endpoints;
pub mod types;

/// Attaches the verifier's routes and state to `rocket`.
pub fn mount(
    rocket: Rocket<Build>,
    config: &VerifierConfig,
    directory: Arc<dyn KeyDirectory>,
) -> Result<Rocket<Build>> {
    let codec = config.token_codec()?;

    Ok(rocket
        .attach(cors::Cors)
        .mount(
            "/",
            routes![
                endpoints::challenge,
                endpoints::claim,
                endpoints::claim_slash,
                endpoints::preflight,
            ],
        )
        .register("/", catchers![endpoints::blank])
        .manage(ChallengeIssuer::new(&config.claim_type, codec.clone()))
        .manage(ClaimVerifier::new(codec, directory)))
}

pub fn setup_rocket(figment: Figment) -> Result<Rocket<Build>> {
    let config = VerifierConfig::from_figment(&figment)?;
    let directory = RemoteKeyDirectory::new(&config.key_directory_url, config.key_fetch_timeout())?;

    mount(rocket::custom(figment), &config, Arc::new(directory))
}
