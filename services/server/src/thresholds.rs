//! Threshold monitors (§4.G): periodic and event-triggered checks over
//! storage and performance counters, publishing `system.health` events.

use crate::config::{PerformanceThresholds, StorageThresholds};
use crate::controller::StorageInfo;
use crate::events::EventManager;
use crate::metrics::{Metrics, MetricsSnapshot};
use rpc_protocol::Topic;
use serde_json::json;

/// Records how many clients had an event dropped on a publish, per the
/// counter `get_metrics` and `Metrics::snapshot` surface (§3).
fn record_dropped(metrics: &Metrics, dropped: u64) {
    for _ in 0..dropped {
        metrics.event_dropped();
    }
}

/// Evaluated on every storage-info query and on a timer (§4.G). Publishes
/// at most one `system.health` event per call -- critical takes precedence
/// over warning, and a healthy reading publishes nothing.
pub async fn check_storage(events: &EventManager, metrics: &Metrics, thresholds: &StorageThresholds, info: &StorageInfo) {
    let severity = if info.usage_percentage >= thresholds.block_percent {
        Some("critical")
    } else if info.usage_percentage >= thresholds.warn_percent {
        Some("warning")
    } else {
        None
    };

    if let Some(severity) = severity {
        let (_, dropped) = events
            .publish(
                Topic::SystemHealth.as_str(),
                json!({
                    "component": "storage",
                    "severity": severity,
                    "reason": "storage_threshold_exceeded",
                    "usage_percentage": info.usage_percentage,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await;
        record_dropped(metrics, dropped);
    }
}

/// Evaluated on each `get_metrics` call (§4.G). Unlike storage, several
/// independent conditions can each warrant their own warning, so every
/// breached threshold publishes its own event.
pub async fn check_performance(
    events: &EventManager,
    metrics: &Metrics,
    thresholds: &PerformanceThresholds,
    snapshot: &MetricsSnapshot,
    memory_percent: f64,
) {
    let mut checks: Vec<(&str, &str)> = Vec::new();

    if memory_percent > thresholds.memory_percent {
        checks.push(("critical", "memory_threshold_exceeded"));
    }
    if snapshot.error_rate_percent > thresholds.error_rate_percent {
        checks.push(("warning", "error_rate_threshold_exceeded"));
    }
    if snapshot.avg_response_time_ms > thresholds.avg_response_ms {
        checks.push(("warning", "response_time_threshold_exceeded"));
    }
    if snapshot.active_connections > thresholds.max_connections {
        checks.push(("warning", "connection_count_threshold_exceeded"));
    }

    for (severity, reason) in checks {
        let (_, dropped) = events
            .publish(
                Topic::SystemHealth.as_str(),
                json!({
                    "component": "performance",
                    "severity": severity,
                    "reason": reason,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await;
        record_dropped(metrics, dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_thresholds() -> StorageThresholds {
        StorageThresholds {
            warn_percent: 80.0,
            block_percent: 95.0,
            poll_interval: std::time::Duration::from_secs(60),
        }
    }

    fn performance_thresholds() -> PerformanceThresholds {
        PerformanceThresholds {
            memory_percent: 90.0,
            error_rate_percent: 5.0,
            avg_response_ms: 1000.0,
            max_connections: 900,
        }
    }

    fn storage_info(usage_percentage: f64) -> StorageInfo {
        StorageInfo {
            total_space: 100,
            used_space: 0,
            available_space: 100,
            usage_percentage,
            recordings_size: 0,
            snapshots_size: 0,
            low_space_warning: usage_percentage >= 80.0,
        }
    }

    #[tokio::test]
    async fn healthy_storage_publishes_nothing() {
        let events = EventManager::new(16);
        let receiver = events.register_client(&"client-1".to_owned()).await;
        events.subscribe(&"client-1".to_owned(), &["system.health".to_owned()], None).await;

        check_storage(&events, &Metrics::new(), &storage_thresholds(), &storage_info(10.0)).await;

        let result = tokio::time::timeout(std::time::Duration::from_millis(20), receiver.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn storage_above_block_percent_publishes_critical() {
        let events = EventManager::new(16);
        let receiver = events.register_client(&"client-1".to_owned()).await;
        events.subscribe(&"client-1".to_owned(), &["system.health".to_owned()], None).await;

        check_storage(&events, &Metrics::new(), &storage_thresholds(), &storage_info(99.0)).await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.payload["severity"], "critical");
        assert_eq!(event.payload["reason"], "storage_threshold_exceeded");
    }

    #[tokio::test]
    async fn storage_above_warn_but_below_block_publishes_warning() {
        let events = EventManager::new(16);
        let receiver = events.register_client(&"client-1".to_owned()).await;
        events.subscribe(&"client-1".to_owned(), &["system.health".to_owned()], None).await;

        check_storage(&events, &Metrics::new(), &storage_thresholds(), &storage_info(85.0)).await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.payload["severity"], "warning");
    }

    #[tokio::test]
    async fn performance_breach_publishes_one_event_per_condition() {
        let events = EventManager::new(16);
        let receiver = events.register_client(&"client-1".to_owned()).await;
        events.subscribe(&"client-1".to_owned(), &["system.health".to_owned()], None).await;

        let snapshot = MetricsSnapshot {
            total_requests: 100,
            total_errors: 20,
            active_connections: 5,
            events_dropped: 0,
            error_rate_percent: 20.0,
            avg_response_time_ms: 50.0,
            per_method: Default::default(),
        };
        check_performance(&events, &Metrics::new(), &performance_thresholds(), &snapshot, 10.0).await;

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.payload["reason"], "error_rate_threshold_exceeded");
        let second = tokio::time::timeout(std::time::Duration::from_millis(20), receiver.recv()).await;
        assert!(second.is_err(), "only the error-rate condition should have breached");
    }
}
