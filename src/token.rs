//! Compact, expiring, HMAC-protected tokens.
//!
//! Tokens are HS256 JWTs. The payload carries the caller's claims flattened
//! alongside `jti`, `iat` and `exp`.

use std::time::Duration;

use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::*;
use crate::key_types;

/// Minimum accepted length of the HMAC secret.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Serialize, Deserialize)]
struct Envelope<C> {
    jti: String,
    #[serde(with = "ts_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    exp: DateTime<Utc>,
    #[serde(flatten)]
    claims: C,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: chrono::Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!(ErrorKind::Config(format!(
                "signing secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let lifetime = chrono::Duration::from_std(lifetime)
            .chain_err(|| ErrorKind::Config("token lifetime out of range".into()))?;

        // Only HS256 is accepted. `exp` must be present but is compared
        // against the caller's clock in `verify_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: validation,
            lifetime: lifetime,
        })
    }

    pub fn from_hex(secret_hex: &str, lifetime: Duration) -> Result<Self> {
        let secret = hex::decode(secret_hex)
            .chain_err(|| ErrorKind::Config("signing secret is not valid hex".into()))?;
        Self::new(&secret, lifetime)
    }

    pub fn create<C: Serialize>(&self, claims: &C) -> Result<String> {
        self.create_at(claims, Utc::now())
    }

    /// Creates a token as if issued at `now`; it stays valid until
    /// `now + lifetime`.
    pub fn create_at<C: Serialize>(&self, claims: &C, now: DateTime<Utc>) -> Result<String> {
        let exp = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| Error::from(ErrorKind::Config("token lifetime overflows the clock".into())))?;

        let envelope = Envelope {
            jti: key_types::token_id()?,
            iat: now,
            exp: exp,
            claims: claims,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding)
            .chain_err(|| "Failed to encode token")
    }

    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C> {
        self.verify_at(token, Utc::now())
    }

    /// Returns the embedded claims if the token is intact and `now` is
    /// before its expiration.
    pub fn verify_at<C: DeserializeOwned>(&self, token: &str, now: DateTime<Utc>) -> Result<C> {
        let envelope = jsonwebtoken::decode::<Envelope<C>>(token, &self.decoding, &self.validation)
            .map_err(rejection)?
            .claims;

        if now >= envelope.exp {
            bail!(ErrorKind::TokenExpired);
        }

        Ok(envelope.claims)
    }
}

fn rejection(err: jsonwebtoken::errors::Error) -> Error {
    let reason = match err.kind() {
        JwtErrorKind::InvalidToken => "expected three segments",
        JwtErrorKind::InvalidAlgorithm => "unsupported algorithm",
        JwtErrorKind::InvalidSignature => "signature mismatch",
        JwtErrorKind::MissingRequiredClaim(_) => "missing expiry",
        JwtErrorKind::Base64(_) => "bad encoding",
        JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => "bad header or payload",
        _ => "rejected",
    };
    ErrorKind::InvalidToken(reason).into()
}
