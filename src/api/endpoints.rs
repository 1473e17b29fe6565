use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{catch, get, options, post, Request, State};

use crate::api::types::*;
use crate::challenge::ChallengeIssuer;
use crate::claim::ClaimVerifier;
use crate::errors::*;

#[get("/challenge")]
pub fn challenge(issuer: &State<ChallengeIssuer>) -> Result<Json<ChallengeResponse>> {
    let issued = issuer.issue()?;

    Ok(Json(ChallengeResponse {
        challenge: issued.challenge,
        token: issued.token,
    }))
}

#[post("/claim", data = "<request>")]
pub async fn claim(
    request: std::result::Result<Json<ClaimRequest>, json::Error<'_>>,
    verifier: &State<ClaimVerifier>,
) -> Result<Json<ClaimResponse>> {
    verify_claim(request, verifier).await
}

// The demo site posts to `/claim/`; Rocket has no empty-segment routes
#[post("/claim/<_..>", data = "<request>")]
pub async fn claim_slash(
    request: std::result::Result<Json<ClaimRequest>, json::Error<'_>>,
    verifier: &State<ClaimVerifier>,
) -> Result<Json<ClaimResponse>> {
    verify_claim(request, verifier).await
}

async fn verify_claim(
    request: std::result::Result<Json<ClaimRequest>, json::Error<'_>>,
    verifier: &ClaimVerifier,
) -> Result<Json<ClaimResponse>> {
    let request = request
        .map_err(|e| Error::from(ErrorKind::MalformedClaim(format!("unreadable body: {}", e))))?;

    let decision = verifier
        .verify(request.token.as_deref(), request.claim.as_deref())
        .await?;

    Ok(Json(decision))
}

#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::Ok
}

/// Anything Rocket itself rejects also goes out with an empty body.
#[catch(default)]
pub fn blank(_status: Status, _req: &Request) {}
