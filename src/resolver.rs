// API base resolution
// Chooses between an absolute API origin and same-origin relative paths

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::error::ApiError;
use crate::page::PageOrigin;

/// API base baked in at build time, if any
pub const BUILD_TIME_API_BASE: Option<&str> = option_env!("UDO_API_BASE");

/// Hostnames treated as internal-only when nothing else is configured
/// (docker-compose service names)
pub const DEFAULT_INTERNAL_HOSTS: &[&str] = &["backend"];

// Bare service names: no dots, not localhost
static SINGLE_LABEL_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

// In-cluster and private DNS zones
static CLUSTER_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(?:svc|svc\.cluster\.local|cluster\.local|internal)$").unwrap()
});

/// Where outgoing API requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiBase {
    /// Relative paths, served by the hosting server's reverse proxy
    SameOrigin,

    /// Absolute API origin, without trailing slash
    Absolute(String),
}

impl ApiBase {
    /// Absolute URL for `path` under this base
    ///
    /// Same-origin bases resolve against the page origin, which is what a
    /// browser does with a relative request path.
    pub fn endpoint(&self, path: &str, origin: &PageOrigin) -> Result<Url, ApiError> {
        let base = match self {
            ApiBase::SameOrigin => origin.as_str(),
            ApiBase::Absolute(base) => base.as_str(),
        };
        let raw = format!("{}{}", base, path);
        Url::parse(&raw).map_err(|e| ApiError::InvalidRequest(format!("{}: {}", raw, e)))
    }

    pub fn is_same_origin(&self) -> bool {
        matches!(self, ApiBase::SameOrigin)
    }
}

/// Trim whitespace and trailing slashes
pub fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Resolves the configured API base once at startup
#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    internal_hosts: Vec<String>,
}

impl Default for BaseUrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNAL_HOSTS.iter().map(|h| h.to_string()).collect())
    }
}

impl BaseUrlResolver {
    pub fn new(internal_hosts: Vec<String>) -> Self {
        Self {
            internal_hosts: internal_hosts
                .into_iter()
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Check whether `host` is only reachable from inside the deployment network
    pub fn is_internal_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();

        if self.internal_hosts.iter().any(|h| *h == host) {
            return true;
        }
        if host == "localhost" {
            return false;
        }
        SINGLE_LABEL_HOST.is_match(&host) || CLUSTER_SUFFIX.is_match(&host)
    }

    /// Resolve a configured base value
    ///
    /// Resolution pipeline:
    /// 1. Empty or missing → same origin
    /// 2. Unparseable or scheme-less → same origin
    /// 3. Internal-only host → same origin
    /// 4. Otherwise the normalized absolute origin
    pub fn resolve(&self, raw: Option<&str>) -> ApiBase {
        let normalized = match raw.map(normalize_base) {
            Some(base) if !base.is_empty() => base,
            _ => {
                tracing::debug!("No API base configured, using same-origin requests");
                return ApiBase::SameOrigin;
            }
        };

        if !normalized.contains("://") {
            tracing::warn!(
                api_base = %normalized,
                "API base has no scheme, using same-origin requests"
            );
            return ApiBase::SameOrigin;
        }

        let host = match Url::parse(&normalized) {
            Ok(url) => url.host_str().map(str::to_string),
            Err(e) => {
                tracing::warn!(
                    api_base = %normalized,
                    error = %e,
                    "Unparseable API base, using same-origin requests"
                );
                return ApiBase::SameOrigin;
            }
        };

        match host {
            Some(host) if self.is_internal_host(&host) => {
                tracing::info!(
                    api_base = %normalized,
                    host = %host,
                    "API base points at an internal host, using same-origin requests"
                );
                ApiBase::SameOrigin
            }
            Some(_) => {
                tracing::debug!(api_base = %normalized, "Using absolute API base");
                ApiBase::Absolute(normalized)
            }
            None => ApiBase::SameOrigin,
        }
    }
}
