//! Short-lived key/value storage with per-key expiry, used to hold signups
//! until the emailed code is confirmed.

pub mod memory;
pub mod pending;
pub mod redis_backend;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryCache;
pub use pending::{PendingSignup, PendingSignups};
pub use redis_backend::RedisCache;

/// A key/value backend where every entry expires after its TTL.
/// An expired entry reads as absent.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
}
