use std::ops::Deref;

use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{self, UnparsedPublicKey};

use crate::errors::*;

/// Length of an Ed25519 signature, which prefixes the message in a combined
/// signed message.
pub const SIGNATURE_LEN: usize = 64;

/// Length of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 8;
const TOKEN_ID_LEN: usize = 16;

// lazy-load a "global" random number generator
lazy_static! {
    pub static ref RANDOM: SystemRandom = {
        let r = SystemRandom::new();
        // Warm up the random number generator
        let _ = r.fill(&mut [0 as u8; 4096]);
        r
    };
}

fn random_hex(len: usize) -> Result<String> {
    let mut data = vec![0u8; len];
    RANDOM
        .deref()
        .fill(&mut data[..])
        .map_err(|_| Error::from("Failed to draw random bytes"))?;
    Ok(hex::encode(&data))
}

/// A fresh challenge nonce: 64 bits of random data, hex encoded.
pub fn nonce() -> Result<String> {
    random_hex(NONCE_LEN)
}

/// A fresh token identifier (`jti`), 128 bits of random data, hex encoded.
pub fn token_id() -> Result<String> {
    random_hex(TOKEN_ID_LEN)
}

/// An attestor's Ed25519 public key as published by the key directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input.trim()).chain_err(|| "Public key is not valid hex")?;

        if bytes.len() != PUBLIC_KEY_LEN {
            bail!(ErrorKind::KeyDirectory(format!(
                "public key is {} bytes, expected {}",
                bytes.len(),
                PUBLIC_KEY_LEN
            )));
        }

        Ok(Self { bytes: bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Opens a combined signed message (`signature || message`, hex encoded) and
/// returns the message it carries.
///
/// Bad hex, a short input, a wrong key, a tampered signature or message, and a
/// non-UTF-8 message all yield `SignatureRejected`.
pub fn open(signed_hex: &str, public_key: &PublicKey) -> Result<String> {
    let signed = hex::decode(signed_hex).map_err(|_| Error::from(ErrorKind::SignatureRejected))?;

    if signed.len() < SIGNATURE_LEN {
        bail!(ErrorKind::SignatureRejected);
    }

    let (sig, message) = signed.split_at(SIGNATURE_LEN);

    UnparsedPublicKey::new(&signature::ED25519, public_key.as_bytes())
        .verify(message, sig)
        .map_err(|_| Error::from(ErrorKind::SignatureRejected))?;

    String::from_utf8(message.to_vec()).map_err(|_| ErrorKind::SignatureRejected.into())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    /// Stands in for the remote attestor: holds a key pair and produces
    /// combined signed messages.
    pub struct Attestor {
        key_pair: Ed25519KeyPair,
    }

    impl Attestor {
        pub fn new() -> Self {
            let pkcs8 = Ed25519KeyPair::generate_pkcs8(RANDOM.deref()).unwrap();
            Self {
                key_pair: Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap(),
            }
        }

        pub fn public_key_hex(&self) -> String {
            hex::encode(self.key_pair.public_key().as_ref())
        }

        pub fn public_key(&self) -> PublicKey {
            PublicKey::from_hex(&self.public_key_hex()).unwrap()
        }

        pub fn sign_combined(&self, message: &str) -> String {
            let sig = self.key_pair.sign(message.as_bytes());
            let mut combined = sig.as_ref().to_vec();
            combined.extend_from_slice(message.as_bytes());
            hex::encode(combined)
        }
    }

    fn kind(err: Error) -> ErrorKind {
        err.0
    }

    #[test]
    fn nonce_is_sixteen_hex_chars() {
        let n = nonce().unwrap();
        assert_eq!(n.len(), 16);
        assert!(hex::decode(&n).is_ok());
        assert_ne!(n, nonce().unwrap());
    }

    #[test]
    fn token_id_is_thirty_two_hex_chars() {
        let id = token_id().unwrap();
        assert_eq!(id.len(), 32);
        assert!(hex::decode(&id).is_ok());
        assert_ne!(id, token_id().unwrap());
    }

    #[test]
    fn open_recovers_message() {
        let attestor = Attestor::new();
        let signed = attestor.sign_combined("over18.abcdef");

        let opened = open(&signed, &attestor.public_key()).unwrap();
        assert_eq!(opened, "over18.abcdef");
    }

    #[test]
    fn open_wrong_key() {
        let attestor = Attestor::new();
        let other = Attestor::new();
        let signed = attestor.sign_combined("over18.abcdef");

        match open(&signed, &other.public_key()).map_err(kind) {
            Err(ErrorKind::SignatureRejected) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn open_tampered_signature() {
        let attestor = Attestor::new();
        let mut signed = hex::decode(attestor.sign_combined("over18.abcdef")).unwrap();
        signed[3] ^= 0x01;

        assert!(open(&hex::encode(signed), &attestor.public_key()).is_err());
    }

    #[test]
    fn open_tampered_message() {
        let attestor = Attestor::new();
        let mut signed = hex::decode(attestor.sign_combined("over18.abcdef")).unwrap();
        let last = signed.len() - 1;
        signed[last] ^= 0x01;

        assert!(open(&hex::encode(signed), &attestor.public_key()).is_err());
    }

    #[test]
    fn open_garbage() {
        let attestor = Attestor::new();
        assert!(open("not hex at all", &attestor.public_key()).is_err());
        assert!(open("abcd", &attestor.public_key()).is_err());
        assert!(open("", &attestor.public_key()).is_err());
    }

    #[test]
    fn public_key_length_checked() {
        assert!(PublicKey::from_hex("abcd").is_err());
        assert!(PublicKey::from_hex("zz").is_err());
        assert!(PublicKey::from_hex(&"ab".repeat(32)).is_ok());
    }
}
