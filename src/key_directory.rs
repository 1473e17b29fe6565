use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;

use crate::errors::*;
use crate::key_types::PublicKey;

/// Somewhere public keys can be looked up by name.
#[rocket::async_trait]
pub trait KeyDirectory: Send + Sync {
    async fn fetch_key(&self, key_name: &str) -> Result<PublicKey>;
}

#[derive(Deserialize)]
struct KeyResponse {
    key: Option<PublishedKey>,
}

#[derive(Deserialize)]
struct PublishedKey {
    #[serde(rename = "publicKey")]
    public_key: Option<String>,
}

/// Extracts `key.publicKey` from a key directory response body.
pub fn parse_key_response(key_name: &str, body: &str) -> Result<PublicKey> {
    let response: KeyResponse =
        serde_json::from_str(body).chain_err(|| "Key directory returned malformed JSON")?;

    match response.key.and_then(|key| key.public_key) {
        Some(ref pk) if !pk.is_empty() => PublicKey::from_hex(pk),
        _ => bail!(ErrorKind::KeyNotFound(key_name.into())),
    }
}

/// The attestor's key-publishing endpoint, `GET <base>/sig/keys/<name>`.
///
/// Keys are fetched fresh on every lookup. Requests are not retried.
pub struct RemoteKeyDirectory {
    client: Client,
    base: Url,
}

impl RemoteKeyDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .chain_err(|| ErrorKind::Config(format!("invalid key directory url '{}'", base_url)))?;

        if base.cannot_be_a_base() {
            bail!(ErrorKind::Config(format!(
                "key directory url '{}' cannot be a base",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: client,
            base: base,
        })
    }

    /// The key name always lands in a single, percent-encoded path segment.
    pub fn key_url(&self, key_name: &str) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::from(ErrorKind::KeyDirectory("base url has no path".into())))?;
            segments.pop_if_empty().extend(&["sig", "keys", key_name]);
        }
        Ok(url)
    }
}

#[rocket::async_trait]
impl KeyDirectory for RemoteKeyDirectory {
    async fn fetch_key(&self, key_name: &str) -> Result<PublicKey> {
        let url = self.key_url(key_name)?;
        debug!(%url, "fetching public key");

        let body = self
            .client
            .get(url)
            .send()
            .await
            .chain_err(|| ErrorKind::KeyDirectory("request failed".into()))?
            .error_for_status()
            .chain_err(|| ErrorKind::KeyDirectory("unexpected status".into()))?
            .text()
            .await
            .chain_err(|| ErrorKind::KeyDirectory("failed to read body".into()))?;

        parse_key_response(key_name, &body)
    }
}
