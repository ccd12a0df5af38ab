use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};

use super::consumed::ConsumedCodes;
use super::session::{Session, SessionHandle};
use super::token_store::{is_usable_token, token_preview, TokenStore};
use super::types::{ExchangeResponse, UserProfile};
use super::{CALLBACK_PATH, ME_PATH};
use crate::error::{ApiError, AuthFailure};
use crate::http_client::{ApiClient, RequestOptions};
use crate::page::{self, Navigator};

/// Page-load session bootstrap
///
/// Reconciles the persisted token and a possible `code` in the page URL into
/// exactly one terminal [`Session`]:
///
/// 1. A fresh code wins: the stored token is discarded, the code exchanged
///    and stripped from the URL whatever the outcome
/// 2. With a token in hand, the profile is fetched
/// 3. Without one, the session is unauthenticated and nothing is called
///
/// Steps run strictly in sequence, each bounded by the step timeout.
pub struct SessionBootstrapper {
    /// Request client (shares the token store)
    client: Arc<ApiClient>,

    /// Current bearer token
    tokens: Arc<TokenStore>,

    /// Page location and history
    page: Arc<dyn Navigator>,

    /// Codes already submitted in this browser session
    consumed: Arc<ConsumedCodes>,

    /// Single writer of the session value
    session: watch::Sender<Session>,

    /// Outcome of the one bootstrap run
    outcome: OnceCell<Session>,

    /// Upper bound for each network step
    step_timeout: Duration,
}

impl SessionBootstrapper {
    pub fn new(
        client: Arc<ApiClient>,
        page: Arc<dyn Navigator>,
        consumed: Arc<ConsumedCodes>,
        step_timeout: Duration,
    ) -> Self {
        let (session, _) = watch::channel(Session::loading());
        Self {
            tokens: client.tokens().clone(),
            client,
            page,
            consumed,
            session,
            outcome: OnceCell::new(),
            step_timeout,
        }
    }

    /// Read-only handle for guards and pages
    pub fn session(&self) -> SessionHandle {
        SessionHandle::new(self.session.subscribe())
    }

    /// Run the bootstrap
    ///
    /// Repeated or concurrent calls share the first run and get its result.
    pub async fn run(&self) -> Session {
        self.outcome.get_or_init(|| self.bootstrap()).await.clone()
    }

    async fn bootstrap(&self) -> Session {
        let location = self.page.current_url();
        let code = page::authorization_code(&location);

        tracing::info!(
            has_code = code.is_some(),
            has_token = self.tokens.get().is_some(),
            "Bootstrapping session"
        );

        let session = match self.reconcile(code).await {
            Ok(Some(user)) => {
                tracing::info!(user = %user.display_name(), "Session authenticated");
                Session::authenticated(user)
            }
            Ok(None) => {
                tracing::info!("Session unauthenticated");
                Session::unauthenticated()
            }
            Err(e) if e.is_unexpected() => {
                tracing::error!(error = %e, "Session bootstrap failed");
                Session::failed(e.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Authentication failed, treating as logged out");
                Session::unauthenticated()
            }
        };

        self.publish(session)
    }

    /// Write a terminal state; an existing terminal state is never replaced
    fn publish(&self, session: Session) -> Session {
        self.session.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = session;
            true
        });
        self.session.borrow().clone()
    }

    async fn reconcile(&self, code: Option<String>) -> Result<Option<UserProfile>, AuthFailure> {
        if let Some(code) = code {
            self.redeem(&code).await?;
        }

        if self.tokens.get().is_none() {
            tracing::debug!("No bearer token available, skipping profile fetch");
            return Ok(None);
        }

        self.fetch_profile().await.map(Some)
    }

    /// Exchange `code` unless it was already claimed, then strip it from
    /// the URL. Ordinary exchange failures are logged and swallowed.
    async fn redeem(&self, code: &str) -> Result<(), AuthFailure> {
        let claimed = match self.consumed.claim(code) {
            Ok(claimed) => claimed,
            Err(e) => {
                self.strip_code();
                return Err(e.into());
            }
        };

        if !claimed {
            tracing::debug!("Authorization code already redeemed, ignoring it");
            self.strip_code();
            return Ok(());
        }

        let result = self.exchange(code).await;
        self.strip_code();

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_unexpected() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Authorization code exchange failed");
                Ok(())
            }
        }
    }

    async fn exchange(&self, code: &str) -> Result<(), AuthFailure> {
        self.tokens.clear()?;

        let options = RequestOptions::get()
            .query("code", code)
            .query("redirect_uri", self.client.origin().as_str());

        let response: ExchangeResponse = self
            .bounded(self.client.request(CALLBACK_PATH, options))
            .await
            .map_err(|e| {
                AuthFailure::from_api(CALLBACK_PATH, e, |status| {
                    AuthFailure::ExchangeRejected { status }
                })
            })?;

        let token = response
            .access_token
            .filter(|t| is_usable_token(t))
            .ok_or(AuthFailure::MissingAccessToken)?;

        tracing::info!(token = %token_preview(&token), "Authorization code exchanged");
        self.tokens.set(Some(token))?;
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<UserProfile, AuthFailure> {
        let err = match self.bounded(self.client.me()).await {
            Ok(user) => return Ok(user),
            Err(e) => e,
        };

        let failure = AuthFailure::from_api(ME_PATH, err, |status| {
            AuthFailure::ProfileRejected { status }
        });

        // Rejected tokens are purged; network failures keep the token
        if let AuthFailure::ProfileRejected { status } = failure {
            self.tokens.clear()?;
            tracing::info!(status = status, "Purged bearer token rejected by identity endpoint");
        }

        Err(failure)
    }

    /// History-replace the current URL without its `code` parameter
    fn strip_code(&self) {
        let current = self.page.current_url();
        let cleaned = page::without_code(&current);
        if cleaned != current {
            self.page.replace_url(cleaned);
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, ApiError>>) -> Result<T, ApiError> {
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Network(format!(
                "timed out after {}ms",
                self.step_timeout.as_millis()
            ))),
        }
    }
}
