//! Keyed query cache with stale time, prefix invalidation, and read retries.
//!
//! Entries are stored as JSON so one cache can hold every response type.
//! A fresh entry (younger than the stale time and not invalidated) is served
//! without calling the fetcher. Anything else is refetched under the read
//! [`RetryPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use labelwise_core::{Error, LineItemStatus, Result};

// =============================================================================
// KEYS
// =============================================================================

/// One component of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Null,
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Str(s)
    }
}

impl From<i64> for KeyPart {
    fn from(n: i64) -> Self {
        KeyPart::Int(n)
    }
}

impl From<u32> for KeyPart {
    fn from(n: u32) -> Self {
        KeyPart::Int(n as i64)
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyPart::Null)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => write!(f, "{:?}", s),
            KeyPart::Int(n) => write!(f, "{}", n),
            KeyPart::Null => f.write_str("null"),
        }
    }
}

/// Ordered tuple identifying a cached query, e.g. `["sample", 7, 12]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new(name: &str) -> Self {
        Self(vec![KeyPart::from(name)])
    }

    /// Append a part.
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// `["line-items", 7]` is a prefix of `["line-items", 7, 1, 10, null]`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", part)?;
        }
        f.write_str("]")
    }
}

/// Keys used by the client. Functions returning a prefix are meant for
/// invalidation.
pub mod keys {
    use super::*;

    /// Current user profile.
    pub fn user() -> QueryKey {
        QueryKey::new("user")
    }

    /// Prefix of every users page.
    pub fn users() -> QueryKey {
        QueryKey::new("users")
    }

    pub fn users_page(page: u32, limit: u32) -> QueryKey {
        users().with(page).with(limit)
    }

    pub fn projects() -> QueryKey {
        QueryKey::new("projects")
    }

    pub fn project_status(project_id: i64) -> QueryKey {
        QueryKey::new("project-status").with(project_id)
    }

    /// Prefix of every line items page of a project.
    pub fn line_items(project_id: i64) -> QueryKey {
        QueryKey::new("line-items").with(project_id)
    }

    pub fn line_items_page(
        project_id: i64,
        page: u32,
        limit: u32,
        status: Option<LineItemStatus>,
    ) -> QueryKey {
        line_items(project_id)
            .with(page)
            .with(limit)
            .with(status.map(|s| s.as_str()))
    }

    pub fn sample(project_id: i64, line_index: u32) -> QueryKey {
        QueryKey::new("sample").with(project_id).with(line_index)
    }

    pub fn admin_dashboard() -> QueryKey {
        QueryKey::new("dashboard").with("admin")
    }

    pub fn user_dashboard() -> QueryKey {
        QueryKey::new("dashboard").with("user")
    }

    pub fn audit_logs(project_id: i64, kind: &str, line_item_id: Option<i64>, page: u32) -> QueryKey {
        QueryKey::new("audit-logs")
            .with(project_id)
            .with(kind)
            .with(line_item_id)
            .with(page)
    }
}

// =============================================================================
// RETRY POLICY
// =============================================================================

/// Retry schedule for failed requests.
///
/// Delay before retry `n` (0-based) is `min(base * 2^n, max)`. A 401 is
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            labelwise_core::defaults::MAX_READ_RETRIES,
            Duration::from_millis(labelwise_core::defaults::RETRY_BASE_DELAY_MS),
            Duration::from_millis(labelwise_core::defaults::RETRY_MAX_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Single attempt. Used for mutations.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether a failure on attempt `attempt` (0 = first try) is retried.
    pub fn should_retry(&self, attempt: u32, error: &Error) -> bool {
        attempt < self.max_retries && !error.is_unauthorized()
    }

    /// Run `op`, retrying failures according to the policy.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt, &e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        subsystem = "cache",
                        op = operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// =============================================================================
// CACHE
// =============================================================================

struct Entry {
    value: JsonValue,
    fetched_at: Instant,
    invalidated: bool,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub entries: usize,
}

/// Shared query cache. Clones share the same storage.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    entries: RwLock<HashMap<QueryKey, Entry>>,
    stats: RwLock<CacheStats>,
    /// Bumped by `clear()` under the entries lock.
    generation: AtomicU64,
    stale_time: Duration,
    retry: RetryPolicy,
}

impl QueryCache {
    pub fn new(stale_time: Duration, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(QueryCacheInner {
                entries: RwLock::new(HashMap::new()),
                stats: RwLock::new(CacheStats::default()),
                generation: AtomicU64::new(0),
                stale_time,
                retry,
            }),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.inner.stale_time
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    /// Cached value if present and fresh.
    pub async fn get_fresh<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.inner.entries.read().await;
        let entry = entries.get(key)?;
        if entry.invalidated || entry.fetched_at.elapsed() >= self.inner.stale_time {
            return None;
        }
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(subsystem = "cache", cache_key = %key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    /// Store a value, replacing any previous entry.
    pub async fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.inner.entries.write().await.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
        Ok(())
    }

    /// Serve `key` from cache when fresh, otherwise fetch it with retries and
    /// store the result.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get_fresh::<T>(&key).await {
            self.inner.stats.write().await.hits += 1;
            debug!(subsystem = "cache", cache_key = %key, "Cache hit");
            return Ok(value);
        }

        self.inner.stats.write().await.misses += 1;
        debug!(subsystem = "cache", cache_key = %key, "Cache miss");

        let generation = self.inner.generation.load(Ordering::Acquire);
        let op = key.to_string();
        let value = self.inner.retry.run(&op, fetcher).await?;
        let json = serde_json::to_value(&value)?;

        let mut entries = self.inner.entries.write().await;
        if self.inner.generation.load(Ordering::Acquire) != generation {
            debug!(subsystem = "cache", cache_key = %key, "Cache cleared during fetch, result not stored");
            return Ok(value);
        }
        entries.insert(
            key,
            Entry {
                value: json,
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
        Ok(value)
    }

    /// Mark every entry under `prefix` stale. Returns the number marked.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.inner.entries.write().await;
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        drop(entries);

        self.inner.stats.write().await.invalidations += 1;
        debug!(subsystem = "cache", cache_key = %prefix, result_count = count, "Invalidated");
        count
    }

    /// Drop every entry under `prefix`.
    pub async fn remove(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop everything. Called on logout. Fetches already in flight finish
    /// but do not store their results.
    pub async fn clear(&self) {
        let mut entries = self.inner.entries.write().await;
        entries.clear();
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        drop(entries);
        debug!(subsystem = "cache", "Cache cleared");
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.inner.entries.read().await.contains_key(key)
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = *self.inner.stats.read().await;
        stats.entries = self.inner.entries.read().await.len();
        stats
    }
}
