use std::time::Duration;

use rocket::figment::Figment;

use crate::errors::*;
use crate::supervisor::RestartPolicy;
use crate::token::TokenCodec;

/// Longest accepted token lifetime: one week.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 7 * 24 * 60 * 60;

fn default_token_lifetime_secs() -> u64 {
    15 * 60
}

fn default_claim_type() -> String {
    "over18".into()
}

fn default_key_directory_url() -> String {
    "https://api.sure.social".into()
}

fn default_key_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_restarts() -> u32 {
    5
}

fn default_restart_window_secs() -> u64 {
    60
}

/// Verifier settings, read once at startup from the same figment Rocket
/// uses (`Rocket.toml`, then `ROCKET_*` environment variables).
///
/// Not `Debug`: `signing_key` is secret.
#[derive(Deserialize, Clone)]
pub struct VerifierConfig {
    /// Hex encoded HMAC secret for challenge tokens
    pub signing_key: String,

    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,

    #[serde(default = "default_claim_type")]
    pub claim_type: String,

    #[serde(default = "default_key_directory_url")]
    pub key_directory_url: String,

    #[serde(default = "default_key_fetch_timeout_secs")]
    pub key_fetch_timeout_secs: u64,

    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    #[serde(default = "default_restart_window_secs")]
    pub restart_window_secs: u64,
}

impl VerifierConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| Error::from(ErrorKind::Config(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.claim_type.is_empty() || self.claim_type.contains('.') {
            bail!(ErrorKind::Config(
                "claim_type must be non-empty and contain no '.'".into()
            ));
        }
        if self.token_lifetime_secs == 0 || self.token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS {
            bail!(ErrorKind::Config(format!(
                "token_lifetime_secs must be between 1 and {}",
                MAX_TOKEN_LIFETIME_SECS
            )));
        }
        if self.key_fetch_timeout_secs == 0 {
            bail!(ErrorKind::Config("key_fetch_timeout_secs must be positive".into()));
        }

        // Surfaces a bad secret now rather than on the first request
        self.token_codec()?;
        Ok(())
    }

    pub fn token_codec(&self) -> Result<TokenCodec> {
        TokenCodec::from_hex(&self.signing_key, self.token_lifetime())
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    pub fn key_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.key_fetch_timeout_secs)
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            max_restarts: self.max_restarts,
            window: Duration::from_secs(self.restart_window_secs),
            ..RestartPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::{Format, Toml};

    const KEY: &str = "2d4a51b5697b93bd3d2caca648e77ebf9d6835da34411f7ca49d54bd5211e48c";

    fn figment(toml: &str) -> Figment {
        Figment::from(Toml::string(toml))
    }

    #[test]
    fn defaults_fill_in() {
        let config = VerifierConfig::from_figment(&figment(&format!("signing_key = \"{}\"", KEY))).unwrap();

        assert_eq!(config.token_lifetime_secs, 900);
        assert_eq!(config.claim_type, "over18");
        assert_eq!(config.key_directory_url, "https://api.sure.social");
        assert_eq!(config.key_fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.restart_policy().max_restarts, 5);
    }

    #[test]
    fn overrides_apply() {
        let toml = format!(
            "signing_key = \"{}\"\nclaim_type = \"over21\"\ntoken_lifetime_secs = 60",
            KEY
        );
        let config = VerifierConfig::from_figment(&figment(&toml)).unwrap();

        assert_eq!(config.claim_type, "over21");
        assert_eq!(config.token_lifetime(), Duration::from_secs(60));
    }

    #[test]
    fn secret_required() {
        assert!(VerifierConfig::from_figment(&figment("")).is_err());
        assert!(VerifierConfig::from_figment(&figment("signing_key = \"abcd\"")).is_err());
        assert!(VerifierConfig::from_figment(&figment("signing_key = \"not hex\"")).is_err());
    }

    #[test]
    fn token_lifetime_is_bounded() {
        for secs in &[0, MAX_TOKEN_LIFETIME_SECS + 1, 10_000_000_000_000] {
            let toml = format!("signing_key = \"{}\"\ntoken_lifetime_secs = {}", KEY, secs);
            assert!(VerifierConfig::from_figment(&figment(&toml)).is_err(), "accepted {}", secs);
        }

        let toml = format!(
            "signing_key = \"{}\"\ntoken_lifetime_secs = {}",
            KEY, MAX_TOKEN_LIFETIME_SECS
        );
        assert!(VerifierConfig::from_figment(&figment(&toml)).is_ok());
    }

    #[test]
    fn claim_type_must_not_contain_separator() {
        let toml = format!("signing_key = \"{}\"\nclaim_type = \"over.18\"", KEY);
        assert!(VerifierConfig::from_figment(&figment(&toml)).is_err());
    }
}
