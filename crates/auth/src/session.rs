// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Refresh-token sessions, one per user.
//!
//! A login stores the user's refresh token under `car-wash:<user_id>`,
//! replacing whatever was there, so only the latest token is ever accepted.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use snafu::ResultExt;
use tokio::sync::RwLock;

use crate::error::{Result, SessionSnafu};

const KEY_PREFIX: &str = "car-wash";

pub fn session_key(user_id: &str) -> String { format!("{KEY_PREFIX}:{user_id}") }

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Stores `refresh_token` as the user's only session for `ttl`.
    async fn put(&self, user_id: &str, refresh_token: &str, ttl: Duration) -> Result<()>;

    async fn get(&self, user_id: &str) -> Result<Option<String>>;

    async fn remove(&self, user_id: &str) -> Result<()>;
}

/// Sessions in Redis, through one connection manager shared by every request.
#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context(SessionSnafu)?;
        let manager = ConnectionManager::new(client).await.context(SessionSnafu)?;
        tracing::info!("connected to redis session store");
        Ok(Self { manager })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, user_id: &str, refresh_token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(session_key(user_id), refresh_token, ttl.as_secs())
            .await
            .context(SessionSnafu)
    }

    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get::<_, Option<String>>(session_key(user_id))
            .await
            .context(SessionSnafu)
    }

    async fn remove(&self, user_id: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(session_key(user_id))
            .await
            .context(SessionSnafu)
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    token:      String,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_expired(&self) -> bool { Instant::now() >= self.expires_at }
}

/// Process-local sessions for tests and single-node runs. Expired entries
/// are dropped lazily on read.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, user_id: &str, refresh_token: &str, ttl: Duration) -> Result<()> {
        let entry = SessionEntry {
            token:      refresh_token.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(session_key(user_id), entry);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        let key = session_key(user_id);
        let mut entries = self.entries.write().await;
        match entries.get(&key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(&key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.token.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, user_id: &str) -> Result<()> {
        self.entries.write().await.remove(&session_key(user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key() {
        assert_eq!(session_key("42"), "car-wash:42");
    }

    #[tokio::test]
    async fn test_put_replaces_previous_session() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(60);
        store.put("u1", "first", ttl).await.unwrap();
        store.put("u1", "second", ttl).await.unwrap();
        assert_eq!(store.get("u1").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.get("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let store = MemorySessionStore::new();
        store.put("u1", "token", Duration::ZERO).await.unwrap();
        assert_eq!(store.get("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemorySessionStore::new();
        store
            .put("u1", "token", Duration::from_secs(60))
            .await
            .unwrap();
        store.remove("u1").await.unwrap();
        store.remove("u1").await.unwrap();
        assert_eq!(store.get("u1").await.unwrap(), None);
    }
}
