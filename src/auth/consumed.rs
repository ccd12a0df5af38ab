use dashmap::DashSet;
use std::sync::Arc;

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Storage key holding the last code submitted for exchange
pub const CONSUMED_CODE_KEY: &str = "consumed_code";

/// Authorization codes already submitted in this browser session
///
/// The code string itself is the one-time-use key: whoever claims it first
/// performs the exchange, everyone else skips it. Claims are kept in memory
/// and, when a store is attached, the last claimed code is also written to
/// the persisted slot so a reload of the same URL sees it.
#[derive(Default)]
pub struct ConsumedCodes {
    codes: DashSet<String>,
    storage: Option<Arc<dyn KeyValueStore>>,
}

impl ConsumedCodes {
    /// In-memory registry, scoped to this process
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry mirrored to the session store
    pub fn persisted(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            codes: DashSet::new(),
            storage: Some(storage),
        }
    }

    /// Claim `code`; true only for the first caller
    pub fn claim(&self, code: &str) -> Result<bool, StorageError> {
        if !self.codes.insert(code.to_string()) {
            return Ok(false);
        }

        let Some(storage) = &self.storage else {
            return Ok(true);
        };

        if storage.get(CONSUMED_CODE_KEY)?.as_deref() == Some(code) {
            tracing::debug!("Authorization code consumed by an earlier page load");
            return Ok(false);
        }

        if let Err(e) = storage.set(CONSUMED_CODE_KEY, code) {
            self.codes.remove(code);
            return Err(e);
        }

        Ok(true)
    }

    pub fn is_consumed(&self, code: &str) -> bool {
        if self.codes.contains(code) {
            return true;
        }
        self.storage
            .as_ref()
            .and_then(|s| s.get(CONSUMED_CODE_KEY).ok().flatten())
            .is_some_and(|last| last == code)
    }
}
