//! Process-wide metrics counters (§3, §4.D.5): atomic request/error
//! counters, a bounded per-method response-time ring, and active
//! connection count. Consumed by `get_metrics` and the performance
//! threshold monitor (§4.G).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const HISTOGRAM_RING_SIZE: usize = 128;

#[derive(Debug, Default)]
struct MethodHistogram {
    samples: Vec<f64>,
    next: usize,
}

impl MethodHistogram {
    fn push(&mut self, sample_ms: f64) {
        if self.samples.len() < HISTOGRAM_RING_SIZE {
            self.samples.push(sample_ms);
        } else {
            self.samples[self.next] = sample_ms;
            self.next = (self.next + 1) % HISTOGRAM_RING_SIZE;
        }
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        }
    }
}

pub struct Metrics {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    active_connections: AtomicU64,
    events_dropped: AtomicU64,
    histograms: Mutex<HashMap<String, MethodHistogram>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MethodStats {
    pub count: u64,
    pub avg_response_time_ms: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub active_connections: u64,
    pub events_dropped: u64,
    pub error_rate_percent: f64,
    pub avg_response_time_ms: f64,
    pub per_method: HashMap<String, MethodStats>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            histograms: Mutex::new(HashMap::new()),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, method: &str, duration_ms: f64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        let mut histograms = self.histograms.lock().expect("metrics histogram mutex poisoned");
        histograms.entry(method.to_owned()).or_default().push(duration_ms);
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        let error_rate_percent = if total_requests == 0 {
            0.0
        } else {
            (total_errors as f64 / total_requests as f64) * 100.0
        };

        let histograms = self.histograms.lock().expect("metrics histogram mutex poisoned");
        let per_method: HashMap<String, MethodStats> = histograms
            .iter()
            .map(|(method, hist)| {
                (
                    method.clone(),
                    MethodStats {
                        count: hist.samples.len() as u64,
                        avg_response_time_ms: hist.average(),
                    },
                )
            })
            .collect();
        let avg_response_time_ms = if per_method.is_empty() {
            0.0
        } else {
            per_method.values().map(|s| s.avg_response_time_ms).sum::<f64>() / per_method.len() as f64
        };

        MetricsSnapshot {
            total_requests,
            total_errors,
            active_connections: self.active_connections(),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            error_rate_percent,
            avg_response_time_ms,
            per_method,
        }
    }
}
