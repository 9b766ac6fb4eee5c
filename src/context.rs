//! Current-session ownership and lifecycle.
//!
//! `SessionContext` holds the one "current" `Session` (or none), the
//! cookie-jar HTTP client shared by login and refresh, and the persisted
//! remember preference. It is the sole owner of the preference's listener
//! slot, installing it on mount and removing it on unmount.
//!
//! First-render reconciliation: the preference is read once at
//! construction and immediately normalized to `false`, so the first frame
//! is a pure function of server-visible state and a pre-rendered pass and
//! a hydrated pass produce identical output. `mount` runs the one-shot
//! catch-up that restores the persisted truth once the host is live.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::auth::{RememberPreference, Session};
use crate::config::AuthConfig;

/// HTTP request timeout for login and refresh calls, in seconds.
const AUTH_TIMEOUT_SECS: u64 = 30;

pub struct SessionContext {
    config: Arc<AuthConfig>,
    http: Client,
    session: Option<Session>,
    remember: RememberPreference,
    initially_remembered: bool,
}

impl SessionContext {
    /// Build the context, deciding silent restoration from the persisted
    /// preference: a remembered visitor gets a restoring session, everyone
    /// else starts logged out.
    pub fn new(config: AuthConfig, remember: RememberPreference) -> Result<Self, ApiError> {
        let http = Client::builder()
            // The HTTP-only refresh credential travels in this jar.
            .cookie_store(true)
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .build()?;
        let config = Arc::new(config);

        let initially_remembered = remember.get();
        if initially_remembered {
            // Normalize for the first render. No listener is installed
            // yet, so this never notifies anyone.
            if let Err(error) = remember.set(false) {
                warn!(%error, "failed to normalize remember preference");
            }
        }

        let session =
            initially_remembered.then(|| Session::restore(http.clone(), Arc::clone(&config)));

        Ok(Self {
            config,
            http,
            session,
            remember,
            initially_remembered,
        })
    }

    /// First interactive mount: install the remember listener, then run the
    /// one-shot catch-up undoing the construction-time normalization.
    pub fn mount(&mut self, listener: impl Fn(bool) + Send + Sync + 'static) {
        self.remember.set_listener(listener);
        if self.initially_remembered {
            if let Err(error) = self.remember.set(true) {
                warn!(%error, "failed to restore remember preference");
            }
        }
    }

    /// Tear down the listener; the store itself keeps no opinion about who
    /// listens next.
    pub fn unmount(&mut self) {
        self.remember.clear_listener();
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn remember(&self) -> &RememberPreference {
        &self.remember
    }

    pub fn initially_remembered(&self) -> bool {
        self.initially_remembered
    }

    pub fn config(&self) -> &Arc<AuthConfig> {
        &self.config
    }

    /// Authenticate and atomically replace the current session.
    ///
    /// Failures surface to the caller for display; the previous session
    /// slot is left untouched.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        let session = Session::login(&self.http, &self.config, username, password).await?;
        info!(username, "login succeeded");
        self.session = Some(session);
        Ok(())
    }

    pub fn logout(&mut self) {
        self.session = None;
    }

    /// Drop a restoring session whose renewal settled without producing an
    /// identity. Renewal failure itself is silent; treating the session as
    /// unauthenticated is the caller-side reaction, and this is it. Call
    /// after the session's `settled` watch fires.
    pub fn reconcile_restoration(&mut self) {
        if let Some(session) = &self.session {
            if session.is_settled() && session.username().is_empty() {
                debug!("restoration settled without identity, dropping session");
                self.session = None;
            }
        }
    }
}
