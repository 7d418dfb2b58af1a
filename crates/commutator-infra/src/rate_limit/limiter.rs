use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_SHARD_COUNT: usize = 16;

#[derive(Debug, Clone)]
struct TokenBucket {
    /// Negative while requests hold reservations for future tokens
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }
}

/// Outcome of reserving a token for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    /// Proceed after sleeping `wait` (zero when a token was available).
    Allowed { wait: Duration, remaining: u32 },
    /// The wait would exceed the deadline; nothing was consumed.
    Rejected { retry_after: Duration },
}

/// Sharded token-bucket limiter keyed by client.
///
/// Each key gets `burst` tokens refilled at `per_minute / 60` per second. A request that
/// finds the bucket empty reserves the next token and waits for it, unless the wait
/// exceeds `max_wait`, in which case the reservation is given back and it is rejected.
#[derive(Clone)]
pub struct HttpRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, TokenBucket>>>>,
    per_minute: u32,
    burst: u32,
    max_wait: Duration,
    trusted_proxy_count: usize,
}

impl HttpRateLimiter {
    pub fn new(per_minute: u32, burst: u32, max_wait: Duration, trusted_proxy_count: usize) -> Self {
        Self::with_shards(per_minute, burst, max_wait, trusted_proxy_count, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(
        per_minute: u32,
        burst: u32,
        max_wait: Duration,
        trusted_proxy_count: usize,
        shard_count: usize,
    ) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            per_minute: per_minute.max(1),
            burst: burst.max(1),
            max_wait,
            trusted_proxy_count,
        }
    }

    pub fn limit_per_minute(&self) -> u32 {
        self.per_minute
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.trusted_proxy_count
    }

    fn capacity(&self) -> f64 {
        f64::from(self.burst)
    }

    fn refill_rate(&self) -> f64 {
        f64::from(self.per_minute) / 60.0
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Reserve a token for `key` without sleeping.
    pub async fn reserve(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let (capacity, rate) = (self.capacity(), self.refill_rate());
        let mut buckets = self.shards[self.shard_index(key)].lock().await;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(capacity, now));

        bucket.refill(now, capacity, rate);
        bucket.tokens -= 1.0;

        if bucket.tokens >= 0.0 {
            return RateLimitDecision::Allowed {
                wait: Duration::ZERO,
                remaining: bucket.tokens.floor() as u32,
            };
        }

        let wait = Duration::from_secs_f64(-bucket.tokens / rate);
        if wait > self.max_wait {
            bucket.tokens += 1.0;
            return RateLimitDecision::Rejected { retry_after: wait };
        }

        RateLimitDecision::Allowed { wait, remaining: 0 }
    }

    /// Reserve and, when allowed, sleep until the reserved token is due.
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self, key: &str) -> RateLimitDecision {
        let decision = self.reserve(key).await;
        if let RateLimitDecision::Allowed { wait, .. } = decision {
            if !wait.is_zero() {
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting for token");
                tokio::time::sleep(wait).await;
            }
        }
        decision
    }

    /// Drop buckets that have refilled completely; they are indistinguishable from new ones.
    pub async fn cleanup_idle_buckets(&self) -> usize {
        let now = Instant::now();
        let (capacity, rate) = (self.capacity(), self.refill_rate());
        let mut removed = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| {
                let mut projected = bucket.clone();
                projected.refill(now, capacity, rate);
                projected.tokens < capacity
            });
            removed += before - buckets.len();
        }

        if removed > 0 {
            tracing::debug!(buckets_cleaned = removed, "Cleaned up idle rate limit buckets");
        }
        removed
    }

    pub async fn tracked_keys(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }

    /// Periodically run [`cleanup_idle_buckets`](Self::cleanup_idle_buckets) until cancelled.
    pub fn spawn_cleanup(
        self: Arc<Self>,
        every: Duration,
        shutdown: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.cleanup_idle_buckets().await;
                    }
                }
            }
        })
    }
}
