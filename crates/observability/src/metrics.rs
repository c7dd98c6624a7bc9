//! In-process metrics registry.
//!
//! Holds bounded, recent-window samples rather than full histories: the
//! registry is a diagnostic surface read by the admin API, not a time-series
//! exporter. Sample buffers cap at [`MAX_SAMPLES`] and evict oldest-first.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};

const MAX_SAMPLES: usize = 5000;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
    /// Refresh attempts that presented an already-revoked token. A spike
    /// here suggests token theft or a misbehaving client.
    refresh_revoke_hits: AtomicU64,
}

#[derive(Debug, Default)]
struct Inner {
    request_ms: VecDeque<f64>,
    worker_ms: VecDeque<f64>,
    status_2xx: u64,
    status_4xx: u64,
    status_5xx: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, status: u16, elapsed_ms: f64) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        push_bounded(&mut inner.request_ms, elapsed_ms);
        match status {
            200..=299 => inner.status_2xx += 1,
            400..=499 => inner.status_4xx += 1,
            500..=599 => inner.status_5xx += 1,
            _ => {}
        }
    }

    pub fn record_worker_duration(&self, elapsed_ms: f64) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        push_bounded(&mut inner.worker_ms, elapsed_ms);
    }

    pub fn record_refresh_revoke_hit(&self) {
        self.refresh_revoke_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_revoke_hits(&self) -> u64 {
        self.refresh_revoke_hits.load(Ordering::Relaxed)
    }

    /// Point-in-time JSON snapshot for the admin metrics endpoint.
    pub fn snapshot(&self) -> Value {
        let Ok(inner) = self.inner.lock() else {
            return json!({ "error": "metrics unavailable" });
        };
        let total = inner.status_2xx + inner.status_4xx + inner.status_5xx;
        let ratio = |n: u64| {
            if total == 0 { 0.0 } else { n as f64 / total as f64 }
        };
        json!({
            "requests": {
                "count": total,
                "latency_ms": {
                    "p50": percentile(&inner.request_ms, 50.0),
                    "p95": percentile(&inner.request_ms, 95.0),
                },
                "status_ratio": {
                    "2xx": ratio(inner.status_2xx),
                    "4xx": ratio(inner.status_4xx),
                    "5xx": ratio(inner.status_5xx),
                },
            },
            "worker": {
                "jobs_sampled": inner.worker_ms.len(),
                "duration_ms": {
                    "p50": percentile(&inner.worker_ms, 50.0),
                    "p95": percentile(&inner.worker_ms, 95.0),
                },
            },
            "refresh_revoke_hits": self.refresh_revoke_hits(),
        })
    }
}

fn push_bounded(samples: &mut VecDeque<f64>, value: f64) {
    if samples.len() == MAX_SAMPLES {
        samples.pop_front();
    }
    samples.push_back(value);
}

/// Nearest-rank percentile; 0.0 when there are no samples.
fn percentile(samples: &VecDeque<f64>, pct: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = samples.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_zeroes() {
        let registry = MetricsRegistry::new();
        let snap = registry.snapshot();
        assert_eq!(snap["requests"]["count"], 0);
        assert_eq!(snap["requests"]["latency_ms"]["p50"], 0.0);
        assert_eq!(snap["refresh_revoke_hits"], 0);
    }

    #[test]
    fn percentiles_over_known_samples() {
        let registry = MetricsRegistry::new();
        for ms in 1..=100 {
            registry.record_request(200, ms as f64);
        }
        let snap = registry.snapshot();
        assert_eq!(snap["requests"]["latency_ms"]["p50"], 50.0);
        assert_eq!(snap["requests"]["latency_ms"]["p95"], 95.0);
    }

    #[test]
    fn status_ratios_sum_to_one() {
        let registry = MetricsRegistry::new();
        registry.record_request(200, 1.0);
        registry.record_request(201, 1.0);
        registry.record_request(404, 1.0);
        registry.record_request(500, 1.0);

        let snap = registry.snapshot();
        assert_eq!(snap["requests"]["status_ratio"]["2xx"], 0.5);
        assert_eq!(snap["requests"]["status_ratio"]["4xx"], 0.25);
        assert_eq!(snap["requests"]["status_ratio"]["5xx"], 0.25);
    }

    #[test]
    fn sample_buffer_is_bounded() {
        let registry = MetricsRegistry::new();
        for ms in 0..(MAX_SAMPLES + 500) {
            registry.record_request(200, ms as f64);
        }
        let snap = registry.snapshot();
        // Oldest 500 samples evicted, so the floor of the window moved up.
        assert_eq!(snap["requests"]["count"], (MAX_SAMPLES + 500) as u64);
        let p50 = snap["requests"]["latency_ms"]["p50"].as_f64().unwrap();
        assert!(p50 > 500.0);
    }

    #[test]
    fn revoke_hits_accumulate() {
        let registry = MetricsRegistry::new();
        registry.record_refresh_revoke_hit();
        registry.record_refresh_revoke_hit();
        assert_eq!(registry.refresh_revoke_hits(), 2);
    }
}
