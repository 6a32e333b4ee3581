use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use quill_types::models::Role;
use serde::{Deserialize, Serialize};

use crate::KvCache;

/// A signup waiting for its emailed code. Both secrets are already hashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignup {
    pub password: String,
    pub code: String,
    pub email: String,
    pub role: Role,
}

/// Typed view over a [`KvCache`] storing pending signups as JSON under
/// `sign_up_<email>`.
#[derive(Clone)]
pub struct PendingSignups {
    cache: Arc<dyn KvCache>,
    ttl: Duration,
}

impl PendingSignups {
    pub fn new(cache: Arc<dyn KvCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn key(email: &str) -> String {
        format!("sign_up_{email}")
    }

    /// Store (or replace) the pending signup for `pending.email`.
    pub async fn put(&self, pending: &PendingSignup) -> Result<()> {
        let value = serde_json::to_string(pending).context("failed to encode pending signup")?;
        self.cache
            .set(&Self::key(&pending.email), value, self.ttl)
            .await
    }

    /// `None` when nothing was stored or the entry expired.
    pub async fn get(&self, email: &str) -> Result<Option<PendingSignup>> {
        match self.cache.get(&Self::key(email)).await? {
            Some(raw) => {
                let pending =
                    serde_json::from_str(&raw).context("corrupt pending signup entry")?;
                Ok(Some(pending))
            }
            None => Ok(None),
        }
    }
}
