//! Claims decoding for bearer access tokens.
//!
//! Access tokens are structurally JWTs: base64url header, payload, and
//! signature separated by dots. Only the payload is read here - signature
//! verification is the issuing server's job, the client merely reads what
//! the token claims. Malformed or absent tokens decode to empty claims
//! rather than erroring: "no identity" is an ordinary state, not a failure.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Role tag carried in the token payload.
///
/// Open-ended by design: `admin` and `editor` are the well-known values but
/// authorization checks accept any string the server chooses to mint.
pub type Role = String;

/// Well-known administrator role.
pub const ROLE_ADMIN: &str = "admin";
/// Well-known editor role.
pub const ROLE_EDITOR: &str = "editor";

/// Identity and authorization claims embedded in an access token.
///
/// Derived, not authoritative: recomputed from the token whenever the
/// session's cache is invalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Decode the claims payload of a bearer token.
///
/// Username and roles come out of a single parse so the two can never
/// desynchronize. Anything that is not a dotted token with a base64url
/// JSON-object payload decodes to [`Claims::default`].
pub fn decode(token: &str) -> Claims {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) => payload,
        _ => return Claims::default(),
    };

    let bytes = match URL_SAFE_NO_PAD.decode(payload) {
        Ok(bytes) => bytes,
        Err(_) => return Claims::default(),
    };

    // Non-object payloads (arrays, bare strings, null) fail the parse and
    // fall back to the empty identity.
    serde_json::from_slice(&bytes).unwrap_or_default()
}
