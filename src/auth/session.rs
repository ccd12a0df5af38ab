// Resolved session state

use serde::Serialize;
use tokio::sync::watch;

use super::types::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
    Error,
}

/// Authentication outcome for the current page load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub status: SessionStatus,
    pub user: Option<UserProfile>,
    pub error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}

impl Session {
    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            user: None,
            error: None,
        }
    }

    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user: Some(user),
            error: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Error,
            user: None,
            error: Some(message.into()),
        }
    }

    /// Anything but `Loading`
    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::Loading
    }
}

/// Read-only view of the page's session
///
/// Handed to route guards and pages; only the bootstrapper holds the
/// sending side.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    pub(crate) fn new(rx: watch::Receiver<Session>) -> Self {
        Self { rx }
    }

    /// Snapshot of the current value
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status
    }

    /// Wait until the bootstrap has written a terminal state
    ///
    /// Returns the last value seen if the bootstrapper is dropped first.
    pub async fn wait_ready(&self) -> Session {
        let mut rx = self.rx.clone();
        let ready = rx.wait_for(Session::is_terminal).await.map(|s| s.clone());
        match ready {
            Ok(session) => session,
            Err(_) => rx.borrow().clone(),
        }
    }
}
