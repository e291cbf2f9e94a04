//! In-process session store with lazy expiry and an injectable clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::traits::{SessionKind, SessionStore};
use crate::error::StoreError;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::milliseconds(by.as_millis() as i64);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    expires_at: DateTime<Utc>,
}

/// Session store kept in process memory.
pub struct MemorySessionStore {
    entries: RwLock<HashMap<(SessionKind, String), Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        })
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            info!(count = removed, "Purged expired session values");
        }
        removed
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        kind: SessionKind,
        user_id: &str,
        text: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Unavailable(format!("invalid ttl: {e}")))?;
        let entry = Entry {
            text: text.to_string(),
            expires_at: self.clock.now() + ttl,
        };
        self.entries
            .write()
            .await
            .insert((kind, user_id.to_string()), entry);
        debug!(key = %kind.key(user_id), "Session value stored");
        Ok(())
    }

    async fn get(&self, kind: SessionKind, user_id: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(kind, user_id.to_string()))
            .filter(|e| e.expires_at > now)
            .map(|e| e.text.clone()))
    }
}

/// Spawn a background task that periodically purges expired values.
pub fn spawn_expiry_task(
    store: Arc<MemorySessionStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.purge_expired().await;
        }
    })
}
