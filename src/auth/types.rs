// Authentication wire types

use serde::{Deserialize, Serialize};

/// Profile returned by the identity endpoint
///
/// Fetched, never mutated locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
}

impl UserProfile {
    /// Label shown in navigation chrome
    pub fn display_name(&self) -> &str {
        [self.preferred_username.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or("User")
    }

    /// Avatar initial
    pub fn initial(&self) -> char {
        self.name
            .as_deref()
            .and_then(|s| s.chars().next())
            .or_else(|| {
                self.preferred_username
                    .as_deref()
                    .and_then(|s| s.chars().next())
            })
            .unwrap_or('U')
    }
}

/// Callback endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}
