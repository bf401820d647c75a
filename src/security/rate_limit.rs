//! Rate Limiting Module
//!
//! Per-caller fixed-window rate limiting. Expired windows are swept so the
//! table stays bounded over the process lifetime.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use crate::config::config::RateLimitSettings;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Sweep expired entries on insert once the table is this large
    pub max_tracked_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_seconds: 60,
            max_tracked_clients: 10_000,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_seconds: settings.window_seconds,
            max_tracked_clients: settings.max_tracked_clients,
        }
    }
}

/// Rate limit result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Rate limiting disabled
    Allowed,
    /// Request is allowed
    AllowedWithInfo(RateLimitInfo),
    /// Request is rate limited
    Limited {
        /// Seconds until retry is allowed
        retry_after: u64,
        /// Rate limit info
        limit: RateLimitInfo,
    },
}

/// Rate limit information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Limit for the current window
    pub limit: u32,
    /// Remaining requests in current window
    pub remaining: u32,
    /// Window reset time
    pub reset_at: DateTime<Utc>,
}

/// Client identifier for rate limiting
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum RateLimitClient {
    /// IP address taken from forwarding headers
    Ip(String),
    /// No address available
    Unknown,
}

impl RateLimitClient {
    /// Create from IP address
    pub fn from_ip(ip: &str) -> Self {
        RateLimitClient::Ip(ip.to_string())
    }

    /// Get client identifier string
    pub fn as_str(&self) -> &str {
        match self {
            RateLimitClient::Ip(s) => s.as_str(),
            RateLimitClient::Unknown => "unknown",
        }
    }

    /// First entry of `X-Forwarded-For`, else `X-Real-IP`, else unknown.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(ip) = headers.get("X-Forwarded-For") {
            if let Ok(ip_str) = ip.to_str() {
                let first = ip_str.split(',').next().unwrap_or(ip_str).trim();
                if !first.is_empty() {
                    return RateLimitClient::from_ip(first);
                }
            }
        }

        if let Some(ip) = headers.get("X-Real-IP") {
            if let Ok(ip_str) = ip.to_str() {
                let ip_str = ip_str.trim();
                if !ip_str.is_empty() {
                    return RateLimitClient::from_ip(ip_str);
                }
            }
        }

        RateLimitClient::Unknown
    }
}

/// One caller's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests seen in the current window
    pub count: u32,
    /// When the window closes
    pub reset_at: DateTime<Utc>,
}

/// In-memory fixed-window rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Rate limit configuration
    config: RateLimitConfig,
    /// Window per client
    entries: Arc<DashMap<String, RateLimitEntry>>,
    /// Whether rate limiting is enabled
    enabled: bool,
    /// Earliest instant (ms) any tracked window can close
    next_expiry_ms: Arc<AtomicI64>,
}

impl RateLimiter {
    /// Create new rate limiter
    pub fn new(config: RateLimitConfig, enabled: bool) -> Self {
        Self {
            config,
            entries: Arc::new(DashMap::new()),
            enabled,
            next_expiry_ms: Arc::new(AtomicI64::new(i64::MIN)),
        }
    }

    /// Create from service settings
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(RateLimitConfig::from(settings), settings.enabled)
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_seconds as i64)
    }

    /// Check and count a request for a client
    pub fn check_rate_limit(&self, client: &RateLimitClient) -> RateLimitResult {
        self.check_at(client, Utc::now())
    }

    /// Check and count a request at an explicit instant.
    ///
    /// The check and the increment happen under the same entry guard.
    pub fn check_at(&self, client: &RateLimitClient, now: DateTime<Utc>) -> RateLimitResult {
        if !self.enabled {
            return RateLimitResult::Allowed;
        }

        // nothing can be swept before the earliest window closes
        if self.entries.len() >= self.config.max_tracked_clients
            && !self.entries.contains_key(client.as_str())
            && now.timestamp_millis() >= self.next_expiry_ms.load(Ordering::Acquire)
        {
            self.sweep_expired_at(now);
        }

        let window = self.window();
        let mut entry = self
            .entries
            .entry(client.as_str().to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at: now + window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window;
        }

        if entry.count >= self.config.max_requests {
            let retry_after = (entry.reset_at - now).num_seconds().max(1) as u64;
            debug!(client = client.as_str(), retry_after, "caller rate limited");
            return RateLimitResult::Limited {
                retry_after,
                limit: RateLimitInfo {
                    limit: self.config.max_requests,
                    remaining: 0,
                    reset_at: entry.reset_at,
                },
            };
        }

        entry.count += 1;

        RateLimitResult::AllowedWithInfo(RateLimitInfo {
            limit: self.config.max_requests,
            remaining: self.config.max_requests - entry.count,
            reset_at: entry.reset_at,
        })
    }

    /// Remove windows that have closed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let mut next_expiry = now + self.window();
        self.entries.retain(|_, entry| {
            if entry.reset_at > now {
                next_expiry = next_expiry.min(entry.reset_at);
                true
            } else {
                false
            }
        });
        self.next_expiry_ms
            .store(next_expiry.timestamp_millis(), Ordering::Release);

        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, next_expiry = %next_expiry, "swept expired rate limit entries");
        }
        removed
    }

    /// Earliest time a tracked window can close, as of the last sweep.
    /// `None` before the first sweep.
    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        match self.next_expiry_ms.load(Ordering::Acquire) {
            i64::MIN => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Number of tracked clients
    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    /// Current window for a client
    pub fn entry(&self, client: &RateLimitClient) -> Option<RateLimitEntry> {
        self.entries.get(client.as_str()).map(|e| *e)
    }
}

/// Spawn a task that periodically sweeps expired entries.
pub fn spawn_sweeper(
    rate_limiter: Arc<RateLimiter>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            rate_limiter.sweep_expired();
        }
    })
}
