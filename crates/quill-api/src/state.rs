use std::sync::Arc;

use anyhow::anyhow;
use axum::http::HeaderName;
use tracing::error;

use quill_cache::PendingSignups;
use quill_db::{Storage, StoreError};
use quill_mail::MailQueue;

use crate::error::ApiError;
use crate::password::SecretHasher;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn Storage>,
    pub signups: PendingSignups,
    pub tokens: TokenService,
    pub hasher: SecretHasher,
    pub mail: MailQueue,
    /// Request header that carries the access token.
    pub auth_header: HeaderName,
}

/// Run a store call on the blocking pool.
pub(crate) async fn run_store<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn Storage) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            error!("store task failed: {}", e);
            ApiError::Internal(anyhow!("store task failed: {}", e))
        })?
        .map_err(ApiError::from)
}

/// Run argon2 work on the blocking pool.
pub(crate) async fn run_hasher<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&SecretHasher) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let hasher = state.hasher.clone();
    tokio::task::spawn_blocking(move || f(&hasher))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("hashing task failed: {}", e)))?
        .map_err(ApiError::Internal)
}
