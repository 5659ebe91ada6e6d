//! Proximity and replay-abuse detection
//!
//! Keeps ephemeral, TTL-bound usage statistics per token: distinct origin
//! addresses, device fingerprints, and country codes, plus a scan counter.
//! The only flag condition is geo-dispersion: one token used from too many
//! distinct countries within its lifetime.
//!
//! The check is advisory. A flagged scan still succeeds; the record is
//! annotated for later review.

use std::sync::Arc;
use std::time::Duration;

use crate::crypto::stats_key;
use rollcall_cache::{CacheResult, EphemeralStore};
use rollcall_types::VerificationFlags;

/// Grace added to the token TTL so stats outlive the token slightly
const STATS_TTL_GRACE: Duration = Duration::from_secs(60);

/// One verified scan's contribution to a token's usage statistics
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub ip: String,
    pub device_fingerprint: String,
    /// Resolved country code; unresolved origins contribute no country
    pub country: Option<String>,
}

/// Aggregated usage statistics for one token
#[derive(Debug, Clone, Default)]
pub struct TokenUsageStats {
    pub ips: Vec<String>,
    pub devices: Vec<String>,
    pub countries: Vec<String>,
    pub scan_count: i64,
}

/// Flag decision for a token
#[derive(Debug, Clone)]
pub struct AnomalyVerdict {
    pub flags: Option<VerificationFlags>,
    pub stats: TokenUsageStats,
}

/// Tracks per-token usage and raises the geo-dispersion flag
pub struct AnomalyDetector<E: EphemeralStore> {
    store: Arc<E>,
    threshold: usize,
    stats_ttl: Duration,
}

impl<E: EphemeralStore> AnomalyDetector<E> {
    /// Create a detector.
    ///
    /// `threshold` is the distinct-country count at which a token is
    /// flagged; `token_ttl` is the token's own validity window, which the
    /// stats outlive by a small grace period.
    pub fn new(store: Arc<E>, threshold: usize, token_ttl: Duration) -> Self {
        Self {
            store,
            threshold,
            stats_ttl: token_ttl + STATS_TTL_GRACE,
        }
    }

    /// Record one verified scan and report whether the token is now
    /// flagged.
    pub async fn record(&self, token: &str, usage: &TokenUsage) -> CacheResult<bool> {
        let base = format!("token_stats:{}", stats_key(token));

        let ips = format!("{base}:ips");
        let devices = format!("{base}:devices");
        let countries = format!("{base}:countries");
        let count = format!("{base}:count");

        self.store.sadd(&ips, &usage.ip).await?;
        self.store.sadd(&devices, &usage.device_fingerprint).await?;
        if let Some(country) = &usage.country {
            self.store.sadd(&countries, country).await?;
        }
        self.store.incr(&count).await?;

        for key in [&ips, &devices, &countries, &count] {
            self.store.expire(key, self.stats_ttl).await?;
        }

        Ok(self.store.scard(&countries).await? >= self.threshold)
    }

    /// Read the usage statistics for a token without recording anything
    pub async fn token_stats(&self, token: &str) -> CacheResult<TokenUsageStats> {
        let base = format!("token_stats:{}", stats_key(token));

        let ips = self.store.smembers(&format!("{base}:ips")).await?;
        let devices = self.store.smembers(&format!("{base}:devices")).await?;
        let countries = self.store.smembers(&format!("{base}:countries")).await?;
        let scan_count = self
            .store
            .get(&format!("{base}:count"))
            .await?
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        Ok(TokenUsageStats {
            ips,
            devices,
            countries,
            scan_count,
        })
    }

    /// Flag decision for a token based on recorded usage only
    pub async fn check(&self, token: &str) -> CacheResult<AnomalyVerdict> {
        let stats = self.token_stats(token).await?;
        let flags = if stats.countries.len() >= self.threshold {
            Some(VerificationFlags::geo_dispersion())
        } else {
            None
        };
        Ok(AnomalyVerdict { flags, stats })
    }
}
