use crate::errors::AccessError;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Bounded retry for optimistic room transactions. Only transient errors
/// are retried; everything else surfaces immediately.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 50,
        }
    }
}

pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AccessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AccessError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                debug!(
                    attempt,
                    code = err.code().as_str(),
                    "transient access-store failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(policy.delay_ms)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
