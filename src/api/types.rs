pub use crate::claim::Decision as ClaimResponse;

#[derive(Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String, // "<claimType>.<nonceHex>"
    pub token: String,     // opaque, only meaningful to this server
}

/// Both fields are checked by the verifier, so absence is not a parse error.
#[derive(Serialize, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub claim: Option<String>, // "type.nonce.salt.keyName.signature"
}
