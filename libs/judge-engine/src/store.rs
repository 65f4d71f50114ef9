/// Result Store - Write-Once Persistence by Attempt Id
///
/// **Critical Properties:**
/// - One result per attempt: a second `put` is rejected with `StoreError::AlreadyStored`
/// - A reader never sees a partially written result
/// - Storage failures are logged by the caller and never reach the candidate
///
/// `RedisResultStore` is the production implementation; `MemoryResultStore`
/// backs tests and local runs.

use crate::error::StoreError;
use futures_util::future::{BoxFuture, FutureExt};
use judge_common::types::ExecutionResult;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub trait ResultStore: Send + Sync {
    /// Persist `result` under `attempt_id`, unless a result is already there
    fn put<'a>(
        &'a self,
        attempt_id: &'a str,
        result: &'a ExecutionResult,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Fetch the result for `attempt_id`, if one was stored
    fn get<'a>(
        &'a self,
        attempt_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ExecutionResult>, StoreError>>;
}

/// Redis-backed store using `SET NX EX`
#[derive(Clone)]
pub struct RedisResultStore {
    conn: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisResultStore {
    pub fn new(conn: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { conn, ttl_seconds }
    }

    /// Connect to `redis_url` and build a store on top of a connection manager
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, ttl_seconds))
    }
}

impl ResultStore for RedisResultStore {
    fn put<'a>(
        &'a self,
        attempt_id: &'a str,
        result: &'a ExecutionResult,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let mut conn = self.conn.clone();
            let stored = judge_common::redis::store_result_once(
                &mut conn,
                attempt_id,
                result,
                self.ttl_seconds,
            )
            .await?;

            if stored {
                Ok(())
            } else {
                Err(StoreError::AlreadyStored(attempt_id.to_string()))
            }
        }
        .boxed()
    }

    fn get<'a>(
        &'a self,
        attempt_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ExecutionResult>, StoreError>> {
        async move {
            let mut conn = self.conn.clone();
            Ok(judge_common::redis::get_result(&mut conn, attempt_id).await?)
        }
        .boxed()
    }
}

/// In-process store
#[derive(Debug, Default, Clone)]
pub struct MemoryResultStore {
    results: Arc<RwLock<HashMap<String, ExecutionResult>>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }
}

impl ResultStore for MemoryResultStore {
    fn put<'a>(
        &'a self,
        attempt_id: &'a str,
        result: &'a ExecutionResult,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let mut results = self.results.write().await;
            if results.contains_key(attempt_id) {
                return Err(StoreError::AlreadyStored(attempt_id.to_string()));
            }
            results.insert(attempt_id.to_string(), result.clone());
            Ok(())
        }
        .boxed()
    }

    fn get<'a>(
        &'a self,
        attempt_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<ExecutionResult>, StoreError>> {
        async move { Ok(self.results.read().await.get(attempt_id).cloned()) }.boxed()
    }
}

/// Fire-and-forget write. The returned handle is only useful to tests and
/// to callers that want to flush before shutting down.
pub fn store_in_background(
    store: Arc<dyn ResultStore>,
    attempt_id: String,
    result: ExecutionResult,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match store.put(&attempt_id, &result).await {
            Ok(()) => debug!(attempt_id = %attempt_id, "Result stored"),
            Err(StoreError::AlreadyStored(_)) => {
                warn!(attempt_id = %attempt_id, "Result already stored, keeping the first one")
            }
            Err(e) => error!(attempt_id = %attempt_id, error = %e, "Failed to store result"),
        }
    })
}
