use blake2::{Blake2b512, Digest};

/// Unkeyed BLAKE2b with its maximum 64 byte output, hex encoded.
pub fn hash(text: &str) -> String {
    hex::encode(Blake2b512::digest(text.as_bytes()))
}

/// The commitment the attestor signs over instead of the raw nonce and salt.
pub fn commitment(nonce: &str, salt: &str) -> String {
    hash(&format!("{}{}", nonce, salt))
}

/// The exact text an attestor is expected to have signed for this claim.
pub fn expected_message(claim_type: &str, nonce: &str, salt: &str) -> String {
    format!("{}.{}", claim_type, commitment(nonce, salt))
}
