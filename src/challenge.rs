use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::*;
use crate::key_types;
use crate::token::TokenCodec;

/// What a challenge token carries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChallengeClaims {
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// `<claimType>.<nonceHex>`, shown to the user
    pub challenge: String,
    /// Opaque token that binds the nonce to this server until it expires
    pub token: String,
}

/// Hands out fresh challenges. Nothing is remembered between calls; the
/// token's expiry is the only lifecycle control.
#[derive(Clone)]
pub struct ChallengeIssuer {
    claim_type: String,
    codec: TokenCodec,
}

impl ChallengeIssuer {
    pub fn new(claim_type: &str, codec: TokenCodec) -> Self {
        Self {
            claim_type: claim_type.into(),
            codec: codec,
        }
    }

    pub fn issue(&self) -> Result<Challenge> {
        self.issue_at(Utc::now())
    }

    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<Challenge> {
        let nonce = key_types::nonce()?;
        let token = self
            .codec
            .create_at(&ChallengeClaims { nonce: nonce.clone() }, now)
            .chain_err(|| "Failed to create challenge token")?;

        debug!(claim_type = %self.claim_type, %nonce, "issued challenge");

        Ok(Challenge {
            challenge: format!("{}.{}", self.claim_type, nonce),
            token: token,
        })
    }
}
