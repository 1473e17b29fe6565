//! Verification of claims returned by the attestor.
//!
//! A claim is `type.nonce.salt.keyName.signature`. The attestor never saw the
//! nonce or salt, only `hash(nonce ++ salt)`, so the verifier rebuilds
//! `"<type>.<hash>"` and requires the attestor's signed message to equal it
//! byte for byte.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::challenge::ChallengeClaims;
use crate::commitment;
use crate::errors::*;
use crate::key_directory::KeyDirectory;
use crate::key_types;
use crate::token::TokenCodec;

const CLAIM_FIELDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub claim_type: String,
    pub nonce: String,
    pub salt: String,
    pub key_name: String,
    pub signature: String,
}

impl FromStr for Claim {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let fields: Vec<&str> = input.split('.').collect();

        if fields.len() != CLAIM_FIELDS {
            bail!(ErrorKind::MalformedClaim(format!(
                "expected {} fields, found {}",
                CLAIM_FIELDS,
                fields.len()
            )));
        }

        if let Some(idx) = fields.iter().position(|f| f.is_empty()) {
            bail!(ErrorKind::MalformedClaim(format!("field {} is empty", idx)));
        }

        Ok(Claim {
            claim_type: fields[0].into(),
            nonce: fields[1].into(),
            salt: fields[2].into(),
            key_name: fields[3].into(),
            signature: fields[4].into(),
        })
    }
}

/// The minimal result released to the relying application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    #[serde(rename = "type")]
    pub claim_type: String,
}

pub struct ClaimVerifier {
    codec: TokenCodec,
    directory: Arc<dyn KeyDirectory>,
}

impl ClaimVerifier {
    pub fn new(codec: TokenCodec, directory: Arc<dyn KeyDirectory>) -> Self {
        Self {
            codec: codec,
            directory: directory,
        }
    }

    pub async fn verify(&self, token: Option<&str>, claim: Option<&str>) -> Result<Decision> {
        self.verify_at(token, claim, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        token: Option<&str>,
        claim: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => bail!(ErrorKind::MissingInput("token")),
        };
        let claim = match claim {
            Some(c) if !c.is_empty() => c,
            _ => bail!(ErrorKind::MissingInput("claim")),
        };

        let token_claims: ChallengeClaims = self.codec.verify_at(token, now)?;
        if token_claims.nonce.is_empty() {
            bail!(ErrorKind::InvalidToken("token carries no nonce"));
        }

        let claim: Claim = claim.parse()?;

        if claim.nonce != token_claims.nonce {
            bail!(ErrorKind::NonceMismatch);
        }

        let public_key = self
            .directory
            .fetch_key(&claim.key_name)
            .await
            .chain_err(|| format!("Failed to resolve key '{}'", claim.key_name))?;

        let expected = commitment::expected_message(&claim.claim_type, &claim.nonce, &claim.salt);
        let signed = key_types::open(&claim.signature, &public_key)?;

        if signed != expected {
            bail!(ErrorKind::MessageMismatch);
        }

        info!(claim_type = %claim.claim_type, key_name = %claim.key_name, "claim verified");

        Ok(Decision {
            claim_type: claim.claim_type,
        })
    }
}
