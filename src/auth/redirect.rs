use reqwest::Url;

use super::token_store::TokenStore;
use super::{LOGOUT_PATH, START_LOGIN_PATH};
use crate::error::ApiError;
use crate::page::{Navigator, PageOrigin};
use crate::resolver::ApiBase;

/// Login and logout navigation targets
///
/// Both are full-page navigations; nothing here expects to run again in
/// the same page session after navigating.
#[derive(Debug, Clone)]
pub struct AuthRedirects {
    login_url: Url,
    logout_url: Url,
}

impl AuthRedirects {
    /// Build both targets under `base`
    ///
    /// The login `redirect_uri` is `origin`, the same value the bootstrap
    /// sends when it exchanges the returned code.
    pub fn new(base: &ApiBase, origin: &PageOrigin, client_id: &str) -> Result<Self, ApiError> {
        let mut login_url = base.endpoint(START_LOGIN_PATH, origin)?;
        login_url
            .query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", origin.as_str());

        let logout_url = base.endpoint(LOGOUT_PATH, origin)?;

        Ok(Self {
            login_url,
            logout_url,
        })
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    pub fn login(&self, page: &dyn Navigator) {
        tracing::info!("Redirecting to identity provider");
        page.navigate_to(self.login_url.clone());
    }

    /// Drop the local token and navigate to the logout endpoint
    ///
    /// Never fails. When no token is held nothing is touched before the
    /// navigation, so repeating it is harmless.
    pub fn logout(&self, tokens: &TokenStore, page: &dyn Navigator) {
        if tokens.get().is_some() {
            if let Err(e) = tokens.clear() {
                tracing::warn!(error = %e, "Failed to clear bearer token before logout");
            }
        }
        tracing::info!("Logging out");
        page.navigate_to(self.logout_url.clone());
    }
}
