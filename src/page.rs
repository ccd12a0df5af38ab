// Page location and navigation
// External-effect boundary for URL rewrites and full-page redirects

use reqwest::Url;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Query parameter carrying the one-time authorization code
pub const CODE_PARAM: &str = "code";

/// Browser navigation seam
///
/// `navigate_to` is a full navigation: callers must not assume execution
/// continues in the same session afterwards.
pub trait Navigator: Send + Sync {
    /// Current page URL
    fn current_url(&self) -> Url;

    /// History replace: rewrite the visible URL without reload or navigation
    fn replace_url(&self, url: Url);

    /// Full-page navigation to `url`
    fn navigate_to(&self, url: Url);
}

/// Serialized origin of the page (`scheme://host[:port]`)
///
/// Both the login redirect and the code exchange take their `redirect_uri`
/// from this one value, so the two are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin(String);

impl PageOrigin {
    pub fn of(url: &Url) -> Self {
        Self(url.origin().ascii_serialization())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Opaque origins (`file:`, `data:`) serialize as "null"
    pub fn is_opaque(&self) -> bool {
        self.0 == "null"
    }
}

impl fmt::Display for PageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract a non-empty `code` query parameter
pub fn authorization_code(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == CODE_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

/// Copy of `url` with every `code` parameter removed; other parameters,
/// path and fragment are kept
pub fn without_code(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != CODE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// In-process page used by the CLI and tests
///
/// Keeps the current location and records every history replace and full
/// navigation.
#[derive(Debug)]
pub struct HeadlessPage {
    location: RwLock<Url>,
    replacements: RwLock<Vec<Url>>,
    navigations: RwLock<Vec<Url>>,
}

impl HeadlessPage {
    pub fn new(location: Url) -> Self {
        Self {
            location: RwLock::new(location),
            replacements: RwLock::new(Vec::new()),
            navigations: RwLock::new(Vec::new()),
        }
    }

    /// Every URL passed to [`Navigator::replace_url`], in order
    pub fn replacements(&self) -> Vec<Url> {
        self.replacements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every URL passed to [`Navigator::navigate_to`], in order
    pub fn navigations(&self) -> Vec<Url> {
        self.navigations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_navigation(&self) -> Option<Url> {
        self.navigations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for HeadlessPage {
    fn current_url(&self) -> Url {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_url(&self, url: Url) {
        tracing::debug!(url = %url, "History replace");
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = url.clone();
        self.replacements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
    }

    fn navigate_to(&self, url: Url) {
        tracing::info!(url = %url, "Navigating");
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = url.clone();
        self.navigations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_origin_omits_path_and_query() {
        let origin = PageOrigin::of(&url("http://app.local:5173/dashboard?code=abc#top"));
        assert_eq!(origin.as_str(), "http://app.local:5173");
        assert!(!origin.is_opaque());
    }

    #[test]
    fn test_origin_drops_default_port() {
        let origin = PageOrigin::of(&url("https://udo.example.com:443/"));
        assert_eq!(origin.to_string(), "https://udo.example.com");
    }

    #[test]
    fn test_file_origin_is_opaque() {
        assert!(PageOrigin::of(&url("file:///tmp/index.html")).is_opaque());
    }

    #[test]
    fn test_authorization_code_extraction() {
        assert_eq!(
            authorization_code(&url("http://a.test/?state=x&code=abc123")).as_deref(),
            Some("abc123")
        );
        assert_eq!(authorization_code(&url("http://a.test/?state=x")), None);
        assert_eq!(authorization_code(&url("http://a.test/?code=")), None);
    }

    #[test]
    fn test_authorization_code_is_decoded() {
        assert_eq!(
            authorization_code(&url("http://a.test/?code=a%2Fb%3D")).as_deref(),
            Some("a/b=")
        );
    }

    #[test]
    fn test_without_code_only_param() {
        let cleaned = without_code(&url("http://a.test/dashboard?code=abc123"));
        assert_eq!(cleaned.as_str(), "http://a.test/dashboard");
    }

    #[test]
    fn test_without_code_keeps_other_params_and_fragment() {
        let cleaned = without_code(&url("http://a.test/p?tab=2&code=abc&session_state=s#frag"));
        assert_eq!(cleaned.as_str(), "http://a.test/p?tab=2&session_state=s#frag");
    }

    #[test]
    fn test_without_code_is_identity_when_absent() {
        let original = url("http://a.test/p?tab=2");
        assert_eq!(without_code(&original), original);
    }

    #[test]
    fn test_headless_page_records_effects() {
        let page = HeadlessPage::new(url("http://a.test/?code=1"));
        page.replace_url(url("http://a.test/"));
        page.navigate_to(url("http://idp.test/login"));

        assert_eq!(page.replacements(), vec![url("http://a.test/")]);
        assert_eq!(page.last_navigation(), Some(url("http://idp.test/login")));
        assert_eq!(page.current_url(), url("http://idp.test/login"));
    }
}
