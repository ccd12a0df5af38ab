use serde::Serialize;
use std::sync::Arc;

use super::redirect::AuthRedirects;
use super::session::{Session, SessionHandle, SessionStatus};
use super::types::UserProfile;
use crate::page::Navigator;

/// What a protected view should render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Bootstrap still running
    Loading,

    /// Not logged in: offer a full redirect to `login_url`
    Login { login_url: String },

    /// Render the protected subtree for `user`
    Protected { user: UserProfile },

    /// Bootstrap hit an unexpected failure
    Failed { message: String, login_url: String },
}

/// Gates protected views on the resolved session
///
/// Reads the session, never writes it.
pub struct RouteGuard {
    session: SessionHandle,
    redirects: AuthRedirects,
    page: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(session: SessionHandle, redirects: AuthRedirects, page: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            redirects,
            page,
        }
    }

    /// Decision for the session as it is right now
    pub fn decide(&self) -> GuardDecision {
        self.decision_for(&self.session.current())
    }

    /// Wait for the bootstrap to finish, then decide
    pub async fn resolve(&self) -> GuardDecision {
        let session = self.session.wait_ready().await;
        self.decision_for(&session)
    }

    /// The login affordance: navigate to the identity provider
    pub fn login(&self) {
        self.redirects.login(self.page.as_ref());
    }

    fn decision_for(&self, session: &Session) -> GuardDecision {
        let login_url = self.redirects.login_url().to_string();
        match (session.status, &session.user) {
            (SessionStatus::Loading, _) => GuardDecision::Loading,
            (SessionStatus::Authenticated, Some(user)) => GuardDecision::Protected { user: user.clone() },
            (SessionStatus::Error, _) => GuardDecision::Failed {
                message: session
                    .error
                    .clone()
                    .unwrap_or_else(|| "Session could not be established".to_string()),
                login_url,
            },
            _ => GuardDecision::Login { login_url },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{HeadlessPage, PageOrigin};
    use crate::resolver::ApiBase;
    use reqwest::Url;
    use tokio::sync::watch;

    fn guard_for(session: Session) -> (RouteGuard, Arc<HeadlessPage>, watch::Sender<Session>) {
        let url = Url::parse("http://app.local:5173/").unwrap();
        let page = Arc::new(HeadlessPage::new(url.clone()));
        let redirects =
            AuthRedirects::new(&ApiBase::SameOrigin, &PageOrigin::of(&url), "udo").unwrap();
        let (tx, rx) = watch::channel(session);
        let guard = RouteGuard::new(SessionHandle::new(rx), redirects, page.clone());
        (guard, page, tx)
    }

    #[test]
    fn test_loading_renders_indicator() {
        let (guard, _, _tx) = guard_for(Session::loading());
        assert_eq!(guard.decide(), GuardDecision::Loading);
    }

    #[test]
    fn test_unauthenticated_offers_login() {
        let (guard, _, _tx) = guard_for(Session::unauthenticated());
        match guard.decide() {
            GuardDecision::Login { login_url } => {
                assert!(login_url.starts_with("http://app.local:5173/api/auth/start-login?"));
                assert!(login_url.contains("client_id=udo"));
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_authenticated_renders_protected() {
        let user = UserProfile {
            preferred_username: Some("ada".to_string()),
            ..Default::default()
        };
        let (guard, _, _tx) = guard_for(Session::authenticated(user.clone()));
        assert_eq!(guard.decide(), GuardDecision::Protected { user });
    }

    #[test]
    fn test_error_carries_message() {
        let (guard, _, _tx) = guard_for(Session::failed("Malformed response"));
        assert!(matches!(
            guard.decide(),
            GuardDecision::Failed { ref message, .. } if message == "Malformed response"
        ));
    }

    #[test]
    fn test_login_is_full_navigation() {
        let (guard, page, _tx) = guard_for(Session::unauthenticated());
        guard.login();
        let target = page.last_navigation().unwrap();
        assert_eq!(target.path(), "/api/auth/start-login");
        assert!(page.replacements().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_waits_for_terminal_state() {
        let (guard, _, tx) = guard_for(Session::loading());
        let pending = guard.resolve();
        tx.send_replace(Session::unauthenticated());
        assert!(matches!(pending.await, GuardDecision::Login { .. }));
    }

    #[test]
    fn test_decision_serializes_with_tag() {
        let json = serde_json::to_value(GuardDecision::Loading).unwrap();
        assert_eq!(json["render"], "loading");
    }
}
