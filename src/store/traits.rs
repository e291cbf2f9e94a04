//! `SessionStore` trait, the TTL key-value interface workers read and write.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Which per-user artifact a session value holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Resume,
    Job,
}

impl SessionKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Job => "job",
        }
    }

    /// Storage key, e.g. `resume:42`.
    pub fn key(&self, user_id: &str) -> String {
        format!("{}:{user_id}", self.prefix())
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Backend-agnostic session store.
///
/// Writes are full overwrites that reset the TTL. A value read after its TTL
/// is reported as absent, exactly like a value that was never written.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `text` under `(kind, user_id)` for `ttl`.
    async fn put(
        &self,
        kind: SessionKind,
        user_id: &str,
        text: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Read the live value for `(kind, user_id)`.
    async fn get(&self, kind: SessionKind, user_id: &str) -> Result<Option<String>, StoreError>;
}
