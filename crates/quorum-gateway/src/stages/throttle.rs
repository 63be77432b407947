use crate::context::{ProtoRequest, ProtoResponse, RequestContext};
use crate::errors::GatewayError;
use crate::now_ms;
use crate::stages::{Stage, StageOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;
use tracing::warn;

const SHARDS: usize = 16;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ThrottleBudget {
    pub capacity: u32,
    pub refill_amount: u32,
    pub refill_interval_ms: u64,
}

impl Default for ThrottleBudget {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_amount: 100,
            refill_interval_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub read: ThrottleBudget,
    pub write: ThrottleBudget,
    /// Peer address prefixes that bypass throttling entirely, e.g. health
    /// probes and sibling services on the cluster network.
    pub exempt_peer_prefixes: Vec<String>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            read: ThrottleBudget::default(),
            write: ThrottleBudget {
                capacity: 20,
                refill_amount: 20,
                refill_interval_ms: 10_000,
            },
            exempt_peer_prefixes: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct ThrottleKey {
    caller: String,
    write: bool,
}

#[derive(Clone, Copy)]
struct Bucket {
    tokens: u32,
    refilled_at_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleOutcome {
    Allowed { remaining: u32 },
    Bypassed,
    Limited,
}

/// Sharded token-bucket limiter keyed by caller and read/write class.
/// Buckets refill in whole intervals; an idle caller is back to full
/// capacity after one interval.
pub struct RequestThrottle {
    config: ThrottleConfig,
    hasher: ahash::RandomState,
    shards: Vec<Mutex<HashMap<ThrottleKey, Bucket, ahash::RandomState>>>,
}

impl RequestThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            hasher: ahash::RandomState::new(),
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::default())).collect(),
        }
    }

    pub fn check(
        &self,
        caller: &str,
        peer_ip: Option<&str>,
        write: bool,
        now_ms: i64,
    ) -> ThrottleOutcome {
        if let Some(ip) = peer_ip {
            if self
                .config
                .exempt_peer_prefixes
                .iter()
                .any(|prefix| ip.starts_with(prefix.as_str()))
            {
                return ThrottleOutcome::Bypassed;
            }
        }

        let budget = if write {
            &self.config.write
        } else {
            &self.config.read
        };
        let key = ThrottleKey {
            caller: caller.to_string(),
            write,
        };
        let shard = (self.hasher.hash_one(&key) as usize) % SHARDS;
        let mut buckets = self.shards[shard].lock();
        let bucket = buckets.entry(key).or_insert(Bucket {
            tokens: budget.capacity,
            refilled_at_ms: now_ms,
        });

        let interval = budget.refill_interval_ms.max(1) as i64;
        let elapsed = now_ms.saturating_sub(bucket.refilled_at_ms);
        if elapsed >= interval {
            let intervals = (elapsed / interval).min(u32::MAX as i64) as u32;
            bucket.tokens = bucket
                .tokens
                .saturating_add(intervals.saturating_mul(budget.refill_amount))
                .min(budget.capacity);
            bucket.refilled_at_ms += intervals as i64 * interval;
        }

        if bucket.tokens == 0 {
            return ThrottleOutcome::Limited;
        }
        bucket.tokens -= 1;
        let remaining = bucket.tokens;
        if remaining.saturating_mul(10) < budget.capacity {
            warn!(caller, write, remaining, "throttle budget nearly exhausted");
        }
        ThrottleOutcome::Allowed { remaining }
    }
}

/// Chain stage applying [`RequestThrottle`] per caller. Runs before token
/// translation so rejected traffic never costs an access lookup. Keyed by
/// peer address; when the peer is unknown (e.g. unix sockets in tests) it
/// falls back to the authenticated user.
pub struct ThrottleStage {
    throttle: Arc<RequestThrottle>,
}

impl ThrottleStage {
    pub fn new(throttle: Arc<RequestThrottle>) -> Self {
        Self { throttle }
    }
}

#[async_trait]
impl Stage for ThrottleStage {
    fn name(&self) -> &'static str {
        "throttle"
    }

    async fn on_request(
        &self,
        cx: &mut RequestContext,
        req: &dyn ProtoRequest,
        _res: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, GatewayError> {
        let caller = cx
            .peer_ip
            .clone()
            .or_else(|| cx.subject_user().map(|u| u.0.clone()));
        let Some(caller) = caller else {
            // No stable key to meter on.
            return Ok(StageOutcome::Continue);
        };
        let write = cx
            .route
            .as_ref()
            .map(|r| r.mutating)
            .unwrap_or_else(|| !matches!(req.method(), "GET" | "HEAD" | "OPTIONS"));

        match self
            .throttle
            .check(&caller, cx.peer_ip.as_deref(), write, now_ms())
        {
            ThrottleOutcome::Bypassed => Ok(StageOutcome::Continue),
            ThrottleOutcome::Allowed { remaining } => {
                cx.rate_remaining = Some(remaining);
                Ok(StageOutcome::Continue)
            }
            ThrottleOutcome::Limited => {
                cx.rate_remaining = Some(0);
                Err(GatewayError::rate_limited(&format!(
                    "caller {caller} exhausted the {} budget",
                    if write { "write" } else { "read" }
                )))
            }
        }
    }
}
