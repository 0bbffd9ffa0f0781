//! Method registry (§4.C): name -> handler plus a parallel name -> version
//! map, each behind its own reader-writer lock. Registration is idempotent;
//! lookup never panics on absence.

use crate::connection::ClientRecord;
use crate::error::RpcError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One registered JSON-RPC method. `invoke` receives the raw params value
/// (absent params arrive as `Value::Null`) and the caller's client record so
/// handlers can read auth state; only `authenticate` mutates it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, params: Value, client: &Arc<ClientRecord>) -> Result<Value, RpcError>;
}

/// Built-in methods that must all be present at startup (§4.C). The two
/// reserved names are included so the dispatcher treats every known name
/// uniformly; invoking either always yields `method_not_found`.
pub const BUILTIN_METHODS: &[&str] = &[
    "ping",
    "authenticate",
    "get_camera_list",
    "get_camera_status",
    "get_camera_capabilities",
    "get_metrics",
    "get_status",
    "get_server_info",
    "get_streams",
    "list_recordings",
    "list_snapshots",
    "get_recording_info",
    "get_snapshot_info",
    "delete_recording",
    "delete_snapshot",
    "get_storage_info",
    "set_retention_policy",
    "cleanup_old_files",
    "take_snapshot",
    "start_recording",
    "stop_recording",
    "start_streaming",
    "stop_streaming",
    "get_stream_url",
    "get_stream_status",
    "subscribe_events",
    "unsubscribe_events",
    "get_subscription_stats",
    "camera_status_update",
    "recording_status_update",
];

#[derive(Default)]
pub struct MethodRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
    versions: RwLock<HashMap<String, String>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: re-registering a name replaces the previous entry.
    pub async fn register(&self, name: &str, version: &str, handler: Arc<dyn Handler>) {
        self.handlers.write().await.insert(name.to_owned(), handler);
        self.versions.write().await.insert(name.to_owned(), version.to_owned());
    }

    pub async fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.read().await.get(name).cloned()
    }

    pub async fn version_of(&self, name: &str) -> Option<String> {
        self.versions.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.handlers.read().await.contains_key(name)
    }

    pub async fn method_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

/// Handler for the two notification-reserved names (§4.C, §9): they stay in
/// the registry like any other method so the dispatcher never special-cases
/// them, but invocation always fails with `method_not_found`.
pub struct ReservedHandler {
    pub name: String,
}

#[async_trait]
impl Handler for ReservedHandler {
    async fn invoke(&self, _params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
        Err(RpcError::MethodNotFound(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionRegistry;

    struct EchoHandler;

    #[async_trait]
    impl Handler for EchoHandler {
        async fn invoke(&self, params: Value, _client: &Arc<ClientRecord>) -> Result<Value, RpcError> {
            Ok(params)
        }
    }

    async fn test_client() -> Arc<ClientRecord> {
        let registry = ConnectionRegistry::new();
        registry.register("client-1".to_owned(), "127.0.0.1:1".to_owned()).await
    }

    #[tokio::test]
    async fn lookup_on_unregistered_name_returns_none() {
        let registry = MethodRegistry::new();
        assert!(registry.lookup("nonexistent").await.is_none());
        assert!(!registry.contains("nonexistent").await);
    }

    #[tokio::test]
    async fn register_then_invoke_round_trips_params() {
        let registry = MethodRegistry::new();
        registry.register("echo", "1.0", Arc::new(EchoHandler)).await;
        let handler = registry.lookup("echo").await.expect("registered handler");
        let client = test_client().await;
        let result = handler.invoke(serde_json::json!({"x": 1}), &client).await.unwrap();
        assert_eq!(result, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn re_registering_a_name_replaces_the_previous_handler() {
        let registry = MethodRegistry::new();
        registry.register("ping", "1.0", Arc::new(EchoHandler)).await;
        registry
            .register(
                "ping",
                "2.0",
                Arc::new(ReservedHandler { name: "ping".to_owned() }),
            )
            .await;
        assert_eq!(registry.method_count().await, 1);
        assert_eq!(registry.version_of("ping").await.as_deref(), Some("2.0"));
        let client = test_client().await;
        let err = registry
            .lookup("ping")
            .await
            .unwrap()
            .invoke(Value::Null, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::MethodNotFound(_)));
    }

    #[tokio::test]
    async fn reserved_handler_always_returns_method_not_found() {
        let handler = ReservedHandler {
            name: "camera_status_update".to_owned(),
        };
        let client = test_client().await;
        let err = handler.invoke(Value::Null, &client).await.unwrap_err();
        assert!(matches!(err, RpcError::MethodNotFound(name) if name == "camera_status_update"));
    }
}
