// Authentication module
// Session bootstrap, bearer-token lifecycle and route gating

mod bootstrap;
mod consumed;
mod guard;
mod redirect;
mod session;
mod token_store;
mod types;

pub use bootstrap::SessionBootstrapper;
pub use consumed::{ConsumedCodes, CONSUMED_CODE_KEY};
pub use guard::{GuardDecision, RouteGuard};
pub use redirect::AuthRedirects;
pub use session::{Session, SessionHandle, SessionStatus};
pub use token_store::{is_usable_token, token_preview, TokenStore, TOKEN_STORAGE_KEY};
pub use types::{ExchangeResponse, UserProfile};

/// Browser navigation to the identity provider
pub const START_LOGIN_PATH: &str = "/api/auth/start-login";

/// Authorization code exchange
pub const CALLBACK_PATH: &str = "/api/auth/callback";

/// Profile of the bearer-token owner
pub const ME_PATH: &str = "/api/auth/me";

/// Browser navigation that clears the server-side session
pub const LOGOUT_PATH: &str = "/api/auth/logout";
