use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};

error_chain! {
    foreign_links {
        Json(::serde_json::Error);
        Hex(::hex::FromHexError);
        Http(::reqwest::Error);
    }

    errors {
        MissingInput(field: &'static str) {
            description("missing input")
            display("missing or empty input: {}", field)
        }
        MalformedClaim(reason: String) {
            description("malformed claim")
            display("malformed claim: {}", reason)
        }
        InvalidToken(reason: &'static str) {
            description("invalid token")
            display("invalid token: {}", reason)
        }
        TokenExpired {
            description("token expired")
            display("token expired")
        }
        NonceMismatch {
            description("nonce mismatch")
            display("claim nonce does not match token nonce")
        }
        KeyNotFound(key_name: String) {
            description("key not found")
            display("key directory has no public key for '{}'", key_name)
        }
        KeyDirectory(reason: String) {
            description("key directory failure")
            display("key directory failure: {}", reason)
        }
        SignatureRejected {
            description("signature rejected")
            display("signature does not verify against the public key")
        }
        MessageMismatch {
            description("message mismatch")
            display("signed message does not match the expected message")
        }
        Config(reason: String) {
            description("configuration error")
            display("configuration error: {}", reason)
        }
        Launch(reason: String) {
            description("launch failure")
            display("server failed: {}", reason)
        }
    }
}

impl Error {
    /// The whole chain on one line, for logs.
    pub fn render(&self) -> String {
        let mut rslt = format!("{}", self);
        for ce in self.iter().skip(1) {
            rslt += &format!(", caused by: {}", ce);
        }
        rslt
    }
}

// Every failure looks the same to the caller: 400 with an empty body.
// The full chain only goes to the log.
impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        tracing::warn!(uri = %req.uri(), error = %self.render(), "request rejected");

        Response::build().status(Status::BadRequest).ok()
    }
}
