//! Authorization gate for protected views.
//!
//! An explicit state machine over three inputs: does a session exist, has
//! its identity resolved (non-empty username), and is the host still in a
//! non-interactive pre-render pass. The host renders whatever outcome
//! `evaluate` returns and performs navigation through the [`Navigator`]
//! seam; re-rendering on state change stays outside the core.
//!
//! The public fallback is deliberately identical whether the cause is
//! "restoration still in progress" or "insufficient privileges" - an
//! observer must not be able to tell the two apart.

use tracing::debug;

use crate::auth::{Role, Session};

/// What the gate wants rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Render the protected children.
    Content,
    /// Render the public "not authorized" view - either restoration has
    /// not settled yet or the visitor's roles are insufficient.
    PublicFallback,
    /// Replace the current location with the login route, carrying the
    /// originating path as a return target.
    RedirectToLogin { target: String, from: String },
}

/// Host navigation seam: replace the current location, optionally
/// recording where the visitor came from.
pub trait Navigator {
    fn replace(&mut self, target: &str, from: Option<&str>);
}

impl GateOutcome {
    /// Perform the navigation this outcome asks for, if any. A single
    /// guarded call; non-redirect outcomes do nothing.
    pub fn navigate(&self, navigator: &mut dyn Navigator) {
        if let GateOutcome::RedirectToLogin { target, from } = self {
            navigator.replace(target, Some(from));
        }
    }
}

/// Gate protecting one mounted view.
///
/// Construct per mount; the one-way public-to-private flip lives for the
/// lifetime of the gate.
pub struct AuthGate {
    required_roles: Option<Vec<Role>>,
    login_path: String,
    prerender: bool,
    initially_remembered: bool,
    render_public: bool,
}

impl AuthGate {
    pub fn new(
        required_roles: Option<Vec<Role>>,
        login_path: impl Into<String>,
        prerender: bool,
        initially_remembered: bool,
    ) -> Self {
        Self {
            required_roles,
            login_path: login_path.into(),
            prerender,
            initially_remembered,
            // Pre-render passes and remembered visitors start public:
            // navigation history is unavailable before hydration, and a
            // remembered visitor is likely mid-restoration.
            render_public: prerender || initially_remembered,
        }
    }

    /// Mark the interactive phase begun. A latch held only because of the
    /// pre-render pass drops here; one held for a remembered visitor stays
    /// until that visitor's restoration settles.
    pub fn hydrate(&mut self) {
        self.prerender = false;
        self.render_public = self.render_public && self.initially_remembered;
    }

    /// Run one transition of the state machine.
    pub fn evaluate(&mut self, session: Option<&Session>, current_path: &str) -> GateOutcome {
        if self.prerender {
            // Never content, never a redirect before interactivity.
            return GateOutcome::PublicFallback;
        }

        if self.render_public {
            let identity_resolved = session.is_some_and(|s| !s.username().is_empty());
            let settled = session.map_or(true, Session::is_settled);
            if !identity_resolved && !settled {
                // Restoration still in flight.
                return GateOutcome::PublicFallback;
            }
            // One-way, one-time: the gate never returns to the latched
            // public state for the rest of its lifetime.
            debug!(identity_resolved, "restoration settled, gate going private");
            self.render_public = false;
        }

        // A session without an identity is indistinguishable from no
        // session: a failed restoration must never privatize into content,
        // open-access gates included.
        let Some(session) = session.filter(|s| !s.username().is_empty()) else {
            return GateOutcome::RedirectToLogin {
                target: self.login_path.clone(),
                from: current_path.to_string(),
            };
        };

        if !session.is_authorized_for(self.required_roles.as_deref()) {
            // Known visitor, insufficient roles: same public view as the
            // transient state, and no redirect.
            return GateOutcome::PublicFallback;
        }

        GateOutcome::Content
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Client;

    use super::*;
    use crate::auth::claims::testutil::token;
    use crate::config::AuthConfig;

    const LOGIN: &str = "/login";

    fn session_with(raw_token: &str) -> Session {
        Session::with_token(
            Client::new(),
            Arc::new(AuthConfig::default()),
            raw_token.to_string(),
        )
    }

    fn roles(tags: &[&str]) -> Option<Vec<Role>> {
        Some(tags.iter().map(|t| t.to_string()).collect())
    }

    #[derive(Default)]
    struct RecordingNavigator {
        calls: Vec<(String, Option<String>)>,
    }

    impl Navigator for RecordingNavigator {
        fn replace(&mut self, target: &str, from: Option<&str>) {
            self.calls.push((target.to_string(), from.map(String::from)));
        }
    }

    #[test]
    fn test_prerender_always_public() {
        let session = session_with(&token("alice", &["admin"]));
        let mut gate = AuthGate::new(roles(&["admin"]), LOGIN, true, false);

        // Even a fully authorized session renders public before hydration.
        assert_eq!(gate.evaluate(Some(&session), "/admin"), GateOutcome::PublicFallback);
        assert_eq!(gate.evaluate(None, "/admin"), GateOutcome::PublicFallback);
    }

    #[test]
    fn test_interactive_without_session_redirects() {
        let mut gate = AuthGate::new(None, LOGIN, false, false);

        assert_eq!(
            gate.evaluate(None, "/posts"),
            GateOutcome::RedirectToLogin {
                target: LOGIN.to_string(),
                from: "/posts".to_string(),
            }
        );
    }

    #[test]
    fn test_hydrate_drops_prerender_latch() {
        let mut gate = AuthGate::new(None, LOGIN, true, false);
        assert_eq!(gate.evaluate(None, "/posts"), GateOutcome::PublicFallback);

        gate.hydrate();
        assert!(matches!(
            gate.evaluate(None, "/posts"),
            GateOutcome::RedirectToLogin { .. }
        ));
    }

    #[test]
    fn test_authorized_session_renders_content() {
        let session = session_with(&token("alice", &["editor"]));
        let mut gate = AuthGate::new(roles(&["editor", "admin"]), LOGIN, false, false);

        assert_eq!(gate.evaluate(Some(&session), "/posts"), GateOutcome::Content);
    }

    #[test]
    fn test_insufficient_roles_render_public_without_redirect() {
        let session = session_with(&token("alice", &["editor"]));
        let mut gate = AuthGate::new(roles(&["admin"]), LOGIN, false, false);

        assert_eq!(gate.evaluate(Some(&session), "/admin"), GateOutcome::PublicFallback);
    }

    #[test]
    fn test_remembered_latch_flips_once_identity_resolves() {
        let mut gate = AuthGate::new(roles(&["editor"]), LOGIN, false, true);

        let resolved = session_with(&token("alice", &["editor"]));
        assert_eq!(gate.evaluate(Some(&resolved), "/posts"), GateOutcome::Content);

        // One-way: losing the session afterwards redirects, never re-latches.
        assert!(matches!(
            gate.evaluate(None, "/posts"),
            GateOutcome::RedirectToLogin { .. }
        ));
        assert!(matches!(
            gate.evaluate(None, "/posts"),
            GateOutcome::RedirectToLogin { .. }
        ));
    }

    #[test]
    fn test_settled_identityless_session_never_renders_content() {
        // A remembered visitor whose restoration settled without an
        // identity still holds a token-less session until the context
        // reconciles; even an open-access gate must redirect, not render.
        let session = session_with("garbage-token");
        assert!(session.is_settled());
        assert_eq!(session.username(), "");

        let mut gate = AuthGate::new(None, LOGIN, false, true);
        assert!(matches!(
            gate.evaluate(Some(&session), "/posts"),
            GateOutcome::RedirectToLogin { .. }
        ));

        // Same for a gate that was never latched.
        let mut gate = AuthGate::new(None, LOGIN, false, false);
        assert!(matches!(
            gate.evaluate(Some(&session), "/posts"),
            GateOutcome::RedirectToLogin { .. }
        ));
    }

    #[test]
    fn test_remembered_latch_releases_when_no_session_appears() {
        // Remembered visitor whose restoring session was dropped after the
        // renewal settled false: the latch releases and the gate redirects.
        let mut gate = AuthGate::new(None, LOGIN, false, true);
        assert!(matches!(
            gate.evaluate(None, "/settings"),
            GateOutcome::RedirectToLogin { .. }
        ));
    }

    #[test]
    fn test_navigate_performs_single_guarded_call() {
        let mut nav = RecordingNavigator::default();

        GateOutcome::PublicFallback.navigate(&mut nav);
        GateOutcome::Content.navigate(&mut nav);
        assert!(nav.calls.is_empty());

        let outcome = GateOutcome::RedirectToLogin {
            target: LOGIN.to_string(),
            from: "/posts".to_string(),
        };
        outcome.navigate(&mut nav);
        assert_eq!(nav.calls, vec![(LOGIN.to_string(), Some("/posts".to_string()))]);
    }
}
