//! Persisted "remember my login" preference.
//!
//! A single boolean stored as the literal strings `"true"`/`"false"` under
//! a fixed key in the config directory. Its identity is independent of any
//! one session: the flag outlives login and logout, and is read once at
//! startup to decide whether to attempt silent session restoration.

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

/// Well-known storage key for the preference.
const PERSIST_LOGIN_KEY: &str = "persist_login";

/// Value reported when nothing is stored or storage is unavailable.
const DEFAULT_PERSIST_LOGIN: bool = false;

type ChangeListener = Box<dyn Fn(bool) + Send + Sync>;

/// The persisted preference plus its single change-listener slot.
///
/// The store takes no position on who listens: the listener is installed
/// and torn down by the session context's mount/unmount lifecycle.
pub struct RememberPreference {
    path: Option<PathBuf>,
    listener: Option<ChangeListener>,
}

impl RememberPreference {
    /// Store under the platform config directory for `app_name`.
    pub fn open(app_name: &str) -> Self {
        let path = dirs::config_dir().map(|dir| dir.join(app_name).join(PERSIST_LOGIN_KEY));
        Self { path, listener: None }
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(dir.into().join(PERSIST_LOGIN_KEY)),
            listener: None,
        }
    }

    /// Store for contexts with no persistent storage, e.g. a pre-render
    /// pass. Reads report the default and writes are dropped.
    pub fn unavailable() -> Self {
        Self { path: None, listener: None }
    }

    pub fn get(&self) -> bool {
        let Some(path) = &self.path else {
            return DEFAULT_PERSIST_LOGIN;
        };
        match std::fs::read_to_string(path) {
            Ok(contents) => contents.trim() == "true",
            Err(_) => DEFAULT_PERSIST_LOGIN,
        }
    }

    /// Persist a new value. The listener is notified only on an actual
    /// value change; re-writing the current value is a no-op.
    pub fn set(&self, value: bool) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if value == self.get() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, if value { "true" } else { "false" })?;
        debug!(value, "remember preference changed");

        if let Some(listener) = &self.listener {
            listener(value);
        }
        Ok(())
    }

    /// Install the single change listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: impl Fn(bool) + Send + Sync + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }
}
