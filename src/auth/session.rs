//! Token-backed session state and renewal.
//!
//! `Session` owns the current access token plus a lazily computed claims
//! cache, and knows how to renew the token against the auth server. The
//! handle is cheap to clone - inner state is shared - so the API client,
//! the session context, and a background restoration task can all hold one.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::debug;

use super::claims::{self, Claims, Role};
use crate::api::ApiError;
use crate::config::AuthConfig;

/// Path of the token renewal endpoint on the auth server.
const REFRESH_PATH: &str = "refresh";

/// Path of the login endpoint on the auth server.
const LOGIN_PATH: &str = "login";

/// Body shape shared by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken", default)]
    access_token: String,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    /// Lazily computed claims; `None` means uncached. Invalidated exactly
    /// when the token is replaced.
    claims: Option<Claims>,
    #[cfg(test)]
    decodes: u32,
}

/// The current authenticated (or restoring) session.
///
/// Clone is cheap - the state sits behind an `Arc` and `reqwest::Client`
/// shares its connection pool internally.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    http: Client,
    config: Arc<AuthConfig>,
    settled: watch::Sender<bool>,
}

impl Session {
    /// Session backed by an explicit token, e.g. fresh from a login.
    /// Immediately usable.
    pub fn with_token(http: Client, config: Arc<AuthConfig>, token: String) -> Self {
        let (settled, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(SessionState {
                token: Some(token),
                ..SessionState::default()
            })),
            http,
            config,
            settled,
        }
    }

    /// Session constructed without a token. Immediately spawns a renewal
    /// attempt to recover an existing server-side session via the refresh
    /// credential in the cookie jar.
    ///
    /// The session starts unresolved; watch [`Session::settled`] before
    /// trusting an empty [`Session::username`]. Dropping every other handle
    /// while the renewal is outstanding is fine - the task finishes against
    /// its own clone and the result is simply never observed.
    pub fn restore(http: Client, config: Arc<AuthConfig>) -> Self {
        let (settled, _) = watch::channel(false);
        let session = Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            http,
            config,
            settled,
        };

        let task = session.clone();
        tokio::spawn(async move {
            let restored = task.renew().await;
            debug!(restored, "session restoration settled");
            task.settled.send_replace(true);
        });

        session
    }

    /// Authenticate against the auth server and build a resolved session.
    ///
    /// The HTTP client should carry a cookie jar so the server can set the
    /// refresh credential alongside the returned access token. Non-2xx
    /// statuses and token-less responses surface as errors for the caller
    /// to display - login failures are never silent.
    pub async fn login(
        http: &Client,
        config: &Arc<AuthConfig>,
        username: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let url = format!("{}/{}", config.auth_base_url.trim_end_matches('/'), LOGIN_PATH);
        let body = serde_json::json!({ "username": username, "password": password });

        let response = http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let body: TokenResponse = response.json().await?;
        if body.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "login response missing access token".to_string(),
            ));
        }

        Ok(Session::with_token(http.clone(), Arc::clone(config), body.access_token))
    }

    /// The current bearer token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    /// Username claimed by the current token; `""` when the token is absent
    /// or undecodable. Never fails.
    pub fn username(&self) -> String {
        self.claims().username
    }

    /// Roles claimed by the current token; empty when the token is absent
    /// or undecodable. Never fails.
    pub fn roles(&self) -> Vec<Role> {
        self.claims().roles
    }

    /// Open-access when `required` is `None` or empty; otherwise true iff
    /// the held roles and the required roles intersect.
    pub fn is_authorized_for(&self, required: Option<&[Role]>) -> bool {
        let required = match required {
            None => return true,
            Some(required) if required.is_empty() => return true,
            Some(required) => required,
        };
        self.roles().iter().any(|role| required.contains(role))
    }

    /// Watch receiver that flips to `true` once a restoration attempt has
    /// settled, successfully or not. Sessions built from an explicit token
    /// are settled from the start.
    pub fn settled(&self) -> watch::Receiver<bool> {
        self.settled.subscribe()
    }

    pub fn is_settled(&self) -> bool {
        *self.settled.borrow()
    }

    /// Ask the auth server for a fresh access token.
    ///
    /// No body and no bearer header: the refresh credential travels in the
    /// cookie jar, attached by the transport. On success the held token is
    /// replaced and the claims cache invalidated. Every failure - network,
    /// status, empty token - resolves to `false` with the prior state
    /// untouched; reacting to a failed renewal is the caller's job.
    ///
    /// Overlapping calls are not deduplicated; both target the same
    /// endpoint with the same ambient credential, so last write wins.
    pub async fn renew(&self) -> bool {
        let url = format!(
            "{}/{}",
            self.config.auth_base_url.trim_end_matches('/'),
            REFRESH_PATH
        );

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, "token renewal request failed");
                return false;
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "token renewal rejected");
            return false;
        }

        let body: TokenResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                debug!(%error, "token renewal response unreadable");
                return false;
            }
        };
        if body.access_token.is_empty() {
            return false;
        }

        let mut state = self.state.lock();
        state.token = Some(body.access_token);
        state.claims = None;
        true
    }

    /// Decode-and-cache: both claim fields are populated from one decode so
    /// a partial failure cannot desynchronize them.
    fn claims(&self) -> Claims {
        let mut state = self.state.lock();
        if let Some(cached) = &state.claims {
            return cached.clone();
        }

        let decoded = claims::decode(state.token.as_deref().unwrap_or(""));
        #[cfg(test)]
        {
            state.decodes += 1;
        }
        state.claims = Some(decoded.clone());
        decoded
    }

    #[cfg(test)]
    pub(crate) fn decode_count(&self) -> u32 {
        self.state.lock().decodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::testutil::token;

    fn session_with(raw_token: &str) -> Session {
        Session::with_token(
            Client::new(),
            Arc::new(AuthConfig::default()),
            raw_token.to_string(),
        )
    }

    #[test]
    fn test_claims_decoded_once_and_cached() {
        let session = session_with(&token("alice", &["editor"]));

        assert_eq!(session.username(), "alice");
        assert_eq!(session.username(), "alice");
        assert_eq!(session.roles(), vec!["editor".to_string()]);
        // One decode serves both fields on every subsequent access.
        assert_eq!(session.decode_count(), 1);
    }

    #[test]
    fn test_undecodable_token_yields_empty_identity() {
        let session = session_with("garbage-token");
        assert_eq!(session.username(), "");
        assert!(session.roles().is_empty());
        assert_eq!(session.decode_count(), 1);
    }

    #[test]
    fn test_open_access_policy() {
        let session = session_with("garbage-token");
        assert!(session.is_authorized_for(None));
        assert!(session.is_authorized_for(Some(&[])));
    }

    #[test]
    fn test_role_intersection() {
        let session = session_with(&token("alice", &["editor"]));

        assert!(!session.is_authorized_for(Some(&["admin".to_string()])));
        assert!(session.is_authorized_for(Some(&["editor".to_string(), "admin".to_string()])));
        assert!(!session.is_authorized_for(Some(&["auditor".to_string()])));
    }

    #[test]
    fn test_arbitrary_role_tags() {
        // Roles are an open set, not a closed enumeration.
        let session = session_with(&token("dave", &["night-shift"]));
        assert!(session.is_authorized_for(Some(&["night-shift".to_string()])));
        assert!(!session.is_authorized_for(Some(&["admin".to_string()])));
    }

    #[test]
    fn test_explicit_token_is_settled() {
        let session = session_with(&token("alice", &["editor"]));
        assert!(session.is_settled());
    }
}
