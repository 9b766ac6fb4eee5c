//! Authentication module for sessions, claims, and the remember preference.
//!
//! This module provides:
//! - `Session`: bearer-token session with lazy claims caching and renewal
//! - `claims`: structural (unverified) decoding of token claims
//! - `RememberPreference`: the persisted "remember my login" flag
//!
//! Tokens are treated as opaque bearer strings; only the claims payload is
//! read, and never verified - verification is the issuing server's job.

pub mod claims;
pub mod remember;
pub mod session;

pub use claims::{Claims, Role};
pub use remember::RememberPreference;
pub use session::Session;
