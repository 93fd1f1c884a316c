//! Fixed-window request limiting keyed by client IP.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, warn};

pub const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_after: Duration,
}

impl Decision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        let reset_at = SystemTime::now()
            .checked_add(self.reset_after)
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(ceil_secs)
            .unwrap_or_default();
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
    }
}

/// Per-client counters. Each key's count and window start are updated under the
/// map shard's lock, so concurrent hits for one client are never lost.
pub struct RateLimiter {
    counters: DashMap<String, Window>,
    max: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u64, window: Duration) -> Self {
        Self { counters: DashMap::new(), max, window }
    }

    /// Counts one request for `key`. Rejected requests still count.
    pub fn hit(&self, key: &str) -> Decision {
        self.hit_at(key, Instant::now())
    }

    fn hit_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(Window { started: now, hits: 0 });

        if now.saturating_duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.hits = 0;
        }
        entry.hits = entry.hits.saturating_add(1);

        Decision {
            allowed: entry.hits <= self.max,
            limit: self.max,
            remaining: self.max.saturating_sub(entry.hits),
            reset_after: self.window.saturating_sub(now.saturating_duration_since(entry.started)),
        }
    }

    /// Drops counters whose window has ended. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.counters.len())
    }

    pub fn reset(&self, key: &str) {
        self.counters.remove(key);
    }

    pub fn reset_all(&self) {
        self.counters.clear();
    }

    pub fn tracked(&self) -> usize {
        self.counters.len()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub async fn enforce(State(limiter): State<Arc<RateLimiter>>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    let decision = limiter.hit(&key);

    if !decision.allowed {
        warn!(client = %key, limit = decision.limit, "rate limit exceeded");
        let mut resp = (StatusCode::TOO_MANY_REQUESTS, REJECTION_MESSAGE).into_response();
        decision.apply_headers(resp.headers_mut());
        resp.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(decision.reset_after)));
        return resp;
    }

    debug!(client = %key, remaining = decision.remaining, "request admitted");
    let mut resp = next.run(req).await;
    decision.apply_headers(resp.headers_mut());
    resp
}

/// Periodically forgets expired counters so memory tracks only recently active clients.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                debug!(removed, remaining = limiter.tracked(), "swept rate limit counters");
            }
        }
    })
}
