//! Small utility helpers: id generation, JSON merging, retry/backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Generate a unique, prefixed id such as `module-0190f3c2...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

/// `true` for JSON objects (not arrays, not null).
pub fn is_object(value: &Value) -> bool {
    value.is_object()
}

/// Recursive merge of two JSON values.
///
/// Objects are merged key by key; any other `source` value replaces `target`.
/// Stores use [`crate::state::shallow_merge`]; this helper is for config
/// defaults layered under per-mount options.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut merged), Value::Object(source)) => {
            for (key, value) in source {
                let existing = merged.remove(&key).unwrap_or(Value::Null);
                let next = if value.is_object() {
                    deep_merge(existing, value)
                } else {
                    value
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (_, source) => source,
    }
}

/// Render an error and its source chain as one line.
pub fn format_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt-1)
    #[default]
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// Retry policy for module data loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt (0 = single attempt).
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            retries: 0,
            ..Default::default()
        }
    }

    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay before retry number `attempt` (1-indexed), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
        };
        delay.min(self.max_delay)
    }
}

/// Run `op` until it succeeds or the policy's retries are exhausted.
///
/// `op` receives the 1-indexed attempt number; `on_retry` is told about each
/// failure that will be retried. The last error is returned on exhaustion.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_retry: impl FnMut(&E, u32),
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt <= policy.retries => {
                on_retry(&err, attempt);
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
