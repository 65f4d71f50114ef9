use crate::types::{ExecutionRequest, ExecutionResult, Submission};
use redis::{AsyncCommands, RedisResult};

/// Redis key semantics shared by the API, the worker and the CLI.
/// Keys are deterministic so every component addresses the same attempt.

pub const QUEUE_KEY: &str = "judge:queue";
pub const RESULT_PREFIX: &str = "judge:result";
pub const CANCEL_PREFIX: &str = "judge:cancel";
pub const REQUEST_PREFIX: &str = "judge:request";

/// How long a cancellation flag stays around after being raised
const CANCEL_TTL_SECONDS: u64 = 3600;

/// Generate result key for an attempt
pub fn result_key(attempt_id: &str) -> String {
    format!("{}:{}", RESULT_PREFIX, attempt_id)
}

/// Generate request key for an attempt
pub fn request_key(attempt_id: &str) -> String {
    format!("{}:{}", REQUEST_PREFIX, attempt_id)
}

/// Generate cancellation key for an attempt
pub fn cancel_key(attempt_id: &str) -> String {
    format!("{}:{}", CANCEL_PREFIX, attempt_id)
}

fn serialization_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, "serialization error", e.to_string()))
}

/// Push a submission onto the queue
/// Uses RPUSH for FIFO semantics
pub async fn push_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission: &Submission,
) -> RedisResult<()> {
    let payload = serde_json::to_string(submission).map_err(serialization_error)?;
    conn.rpush(QUEUE_KEY, payload).await
}

/// Pop a submission from the queue
/// Uses BLPOP with timeout for graceful shutdown
pub async fn pop_submission(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> RedisResult<Option<Submission>> {
    let result: Option<(String, String)> = conn.blpop(QUEUE_KEY, timeout_seconds).await?;

    match result {
        Some((_key, payload)) => {
            let submission: Submission = serde_json::from_str(&payload).map_err(|e| {
                redis::RedisError::from((
                    redis::ErrorKind::TypeError,
                    "deserialization error",
                    e.to_string(),
                ))
            })?;
            Ok(Some(submission))
        }
        None => Ok(None),
    }
}

/// Store a result only if none exists for this attempt yet.
/// Returns `false` when a result was already present.
pub async fn store_result_once(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
    result: &ExecutionResult,
    ttl_seconds: u64,
) -> RedisResult<bool> {
    let payload = serde_json::to_string(result).map_err(serialization_error)?;

    // SET NX replies nil when the key already exists
    let reply: Option<String> = redis::cmd("SET")
        .arg(result_key(attempt_id))
        .arg(payload)
        .arg("NX")
        .arg("EX")
        .arg(ttl_seconds)
        .query_async(conn)
        .await?;

    Ok(reply.is_some())
}

/// Retrieve a stored result
pub async fn get_result(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
) -> RedisResult<Option<ExecutionResult>> {
    let payload: Option<String> = conn.get(result_key(attempt_id)).await?;

    match payload {
        Some(data) => {
            let result: ExecutionResult = serde_json::from_str(&data).map_err(|e| {
                redis::RedisError::from((
                    redis::ErrorKind::TypeError,
                    "deserialization error",
                    e.to_string(),
                ))
            })?;
            Ok(Some(result))
        }
        None => Ok(None),
    }
}

/// Keep the submitted request next to its future result, so readers can
/// tell visible test cases from hidden ones. Write-once like the result:
/// returns `false` when a request is already stored for this attempt.
pub async fn store_request(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
    request: &ExecutionRequest,
    ttl_seconds: u64,
) -> RedisResult<bool> {
    let payload = serde_json::to_string(request).map_err(serialization_error)?;

    let reply: Option<String> = redis::cmd("SET")
        .arg(request_key(attempt_id))
        .arg(payload)
        .arg("NX")
        .arg("EX")
        .arg(ttl_seconds)
        .query_async(conn)
        .await?;

    Ok(reply.is_some())
}

/// Forget a stored request, so the attempt id can be submitted again
pub async fn remove_request(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
) -> RedisResult<()> {
    conn.del(request_key(attempt_id)).await
}

/// Retrieve a stored request
pub async fn get_request(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
) -> RedisResult<Option<ExecutionRequest>> {
    let payload: Option<String> = conn.get(request_key(attempt_id)).await?;

    match payload {
        Some(data) => serde_json::from_str(&data).map(Some).map_err(|e| {
            redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "deserialization error",
                e.to_string(),
            ))
        }),
        None => Ok(None),
    }
}

/// Raise the cancellation flag for an attempt
pub async fn request_cancellation(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
) -> RedisResult<()> {
    redis::cmd("SET")
        .arg(cancel_key(attempt_id))
        .arg(1)
        .arg("EX")
        .arg(CANCEL_TTL_SECONDS)
        .query_async(conn)
        .await
}

/// Check whether an attempt has been cancelled
pub async fn is_cancelled(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &str,
) -> RedisResult<bool> {
    conn.exists(cancel_key(attempt_id)).await
}
