use reqwest::header::HeaderValue;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Fixed storage key holding the raw bearer token
pub const TOKEN_STORAGE_KEY: &str = "access_token";

/// Short prefix of a token, safe for logs
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}

/// True when `token` can travel in an `Authorization: Bearer` header
pub fn is_usable_token(token: &str) -> bool {
    !token.is_empty() && HeaderValue::from_str(&format!("Bearer {}", token)).is_ok()
}

/// Current bearer token, mirrored to the persisted slot
///
/// The memory lock is held across the storage write, so readers never see
/// memory and storage disagree once a `set` has returned. Storage is written
/// first; if it fails the in-memory value is left as it was.
pub struct TokenStore {
    /// Current access token
    token: RwLock<Option<String>>,

    /// Persisted mirror
    storage: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a store seeded from the persisted slot
    ///
    /// A persisted value that cannot be sent as a bearer header is purged.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let token = match storage.get(TOKEN_STORAGE_KEY)? {
            Some(t) if is_usable_token(&t) => Some(t),
            Some(t) if !t.is_empty() => {
                tracing::warn!("Purging persisted bearer token that is not a valid header value");
                storage.remove(TOKEN_STORAGE_KEY)?;
                None
            }
            _ => None,
        };

        if let Some(ref t) = token {
            tracing::debug!(token = %token_preview(t), "Loaded persisted bearer token");
        }

        Ok(Self {
            token: RwLock::new(token),
            storage,
        })
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a token, or clear both copies with `None` (an empty string
    /// counts as `None`)
    pub fn set(&self, token: Option<String>) -> Result<(), StorageError> {
        let token = token.filter(|t| !t.is_empty());
        let mut current = self.token.write().unwrap_or_else(PoisonError::into_inner);

        match token {
            Some(t) => {
                self.storage.set(TOKEN_STORAGE_KEY, &t)?;
                tracing::debug!(token = %token_preview(&t), "Stored bearer token");
                *current = Some(t);
            }
            None => {
                self.storage.remove(TOKEN_STORAGE_KEY)?;
                if current.take().is_some() {
                    tracing::debug!("Cleared bearer token");
                }
            }
        }

        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.set(None)
    }
}
