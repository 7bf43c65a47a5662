//! Session Lifecycle Controller.
//!
//! Sole writer of the [`SessionStore`]. Drives
//! `Anonymous -> Authenticating -> Authenticated -> (Expired | logged out) -> Anonymous`
//! and broadcasts every change so UI consumers can react (an `Expired` event
//! is the signal to send the user back to the login surface).

use super::store::{short_id, Session, SessionStore};
use crate::app::errors::{ConsoleError, ConsoleResult};
use crate::app::resource_explorer::backend::BackendClient;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    /// The backend rejected the session. Behaves like `Anonymous` for
    /// fetches; kept distinct so the UI can explain why it is at the login
    /// surface.
    Expired,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Expired => "expired",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// Redirect to login
    Expired,
}

const EVENT_CAPACITY: usize = 16;

pub struct SessionController {
    store: Arc<SessionStore>,
    backend: BackendClient,
    login_lock: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("backend", self.backend.base_url())
            .finish()
    }
}

impl SessionController {
    /// A store that already holds a persisted id starts out `Authenticated`
    pub fn new(store: Arc<SessionStore>, backend: BackendClient) -> Self {
        let initial = if store.is_present() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        let (state_tx, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            store,
            backend,
            login_lock: Mutex::new(()),
            state_tx,
            events,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to login, logout and expiry events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Assume `role_arn` in `region` and store the returned session.
    ///
    /// Logging in while a session exists replaces it: the old session is
    /// cleared before the request is sent. On failure the controller is left
    /// `Anonymous` and nothing is retried.
    pub async fn login(&self, role_arn: &str, region: &str) -> ConsoleResult<Session> {
        let role_arn = role_arn.trim();
        let region = region.trim();
        if role_arn.is_empty() {
            return Err(ConsoleError::InvalidInput(
                "Role ARN must not be empty".to_string(),
            ));
        }
        if region.is_empty() {
            return Err(ConsoleError::InvalidInput(
                "Region must not be empty".to_string(),
            ));
        }

        let _guard = self.login_lock.lock().await;

        if self.store.is_present() {
            if let Err(e) = self.store.clear(|| self.emit(SessionEvent::LoggedOut)) {
                // The new id overwrites the persisted one below
                warn!("Previous session not removed from disk: {}", e);
            }
        }
        self.set_state(SessionState::Authenticating);
        info!(region = %region, "Assuming role {}", role_arn);

        let response = match self.backend.assume_role(role_arn, region).await {
            Ok(response) if !response.session_id.trim().is_empty() => response,
            Ok(_) => {
                self.set_state(SessionState::Anonymous);
                warn!("Role assumption returned an empty session id");
                return Err(ConsoleError::AuthenticationFailed {
                    message: "backend returned an empty session id".to_string(),
                });
            }
            Err(e) => {
                self.set_state(SessionState::Anonymous);
                warn!("Role assumption failed: {}", e);
                return Err(e);
            }
        };

        let session = Session::new(response.session_id.clone())
            .with_expiration(response.expiration_time());

        let stored = self.store.store(session.clone(), || {
            self.set_state(SessionState::Authenticated);
            self.emit(SessionEvent::LoggedIn);
        });
        if let Err(e) = stored {
            self.set_state(SessionState::Anonymous);
            return Err(e);
        }

        info!(
            expiration = ?session.expiration(),
            "Session {}... established",
            session.short_id()
        );

        Ok(session)
    }

    /// Clear the session from any state. Idempotent.
    ///
    /// The controller is `Anonymous` afterwards even if the persisted id
    /// could not be removed; that storage error is still returned.
    pub fn logout(&self) -> ConsoleResult<()> {
        let had_session = self.store.is_present();
        let result = self.store.clear(|| {
            self.set_state(SessionState::Anonymous);
            if had_session {
                self.emit(SessionEvent::LoggedOut);
            }
        });

        if had_session {
            info!("Logged out");
        }
        if let Err(e) = &result {
            warn!("Session not removed from disk: {}", e);
        }
        result
    }

    /// Called by the resource client when the backend answers 401 for
    /// `rejected_id`.
    ///
    /// Returns true if this call invalidated the session. Later calls for the
    /// same id, and calls for an id that has since been replaced by a newer
    /// login, are no-ops.
    pub fn on_unauthorized(&self, rejected_id: &str) -> bool {
        // State and event change under the store lock, so a login racing
        // this call cannot be overwritten with `Expired`
        let cleared = self.store.clear_if_current(rejected_id, || {
            self.set_state(SessionState::Expired);
            self.emit(SessionEvent::Expired);
        });
        if !cleared {
            return false;
        }

        warn!(
            "Session {}... rejected by backend, login required",
            short_id(rejected_id)
        );
        true
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
