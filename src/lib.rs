//! Tokengate - client-side session and credential management.
//!
//! This crate holds a short-lived bearer access token, lazily derives
//! identity and role claims from it, silently renews it when the resource
//! API reports it expired, and gates protected views on role membership.
//!
//! The pieces, leaf-first:
//! - [`auth::claims`]: structural (unverified) decoding of token claims
//! - [`auth::Session`]: the token holder with lazy claims caching and renewal
//! - [`api::ApiClient`]: resource API client with bearer injection and the
//!   403 renew-and-retry protocol
//! - [`auth::RememberPreference`]: the persisted "remember my login" flag
//! - [`context::SessionContext`]: ownership of the current session and the
//!   preference listener lifecycle
//! - [`gate::AuthGate`]: the state machine deciding whether protected
//!   content, a public fallback, or a login redirect is shown

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod gate;

pub use api::{ApiClient, ApiError};
pub use auth::{Claims, RememberPreference, Role, Session};
pub use config::AuthConfig;
pub use context::SessionContext;
pub use gate::{AuthGate, GateOutcome, Navigator};
