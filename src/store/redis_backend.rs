//! Redis-backed session store (`SETEX` / `GET`).

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::traits::{SessionKind, SessionStore};
use crate::error::StoreError;

/// Session store backed by a Redis server.
///
/// Expiry is delegated to Redis; keys are `resume:{user_id}` / `job:{user_id}`.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!("Connected to Redis session store");
        Ok(Self { conn })
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        kind: SessionKind,
        user_id: &str,
        text: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(kind.key(user_id), text, seconds)
            .await
            .map_err(unavailable)
    }

    async fn get(&self, kind: SessionKind, user_id: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(kind.key(user_id))
            .await
            .map_err(unavailable)
    }
}
