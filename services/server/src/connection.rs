//! Connection registry (§4.B): client records keyed by client id, auth
//! state, and last-activity tracking. Lookups take shared access; the
//! mutation that matters (insert/remove, authenticate) takes exclusive
//! access over a short critical section -- no handler ever runs while the
//! registry lock is held.

use chrono::{DateTime, Utc};
use rpc_protocol::Role;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub authenticated: bool,
    pub user_id: String,
    pub role: Option<Role>,
    pub auth_method: Option<String>,
}

pub struct ClientRecord {
    pub client_id: String,
    pub remote_addr: String,
    pub connect_time: DateTime<Utc>,
    auth: RwLock<AuthState>,
    last_seen: RwLock<DateTime<Utc>>,
}

impl ClientRecord {
    fn new(client_id: String, remote_addr: String) -> Self {
        let now = Utc::now();
        Self {
            client_id,
            remote_addr,
            connect_time: now,
            auth: RwLock::new(AuthState::default()),
            last_seen: RwLock::new(now),
        }
    }

    pub async fn auth_state(&self) -> AuthState {
        self.auth.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.auth.read().await.authenticated
    }

    pub async fn role(&self) -> Option<Role> {
        self.auth.read().await.role
    }

    /// The only place `ClientRecord` state mutates besides `last_seen`
    /// (§9 design note): a successful `authenticate` call.
    pub async fn authenticate(&self, user_id: String, role: Role, auth_method: &str) {
        let mut auth = self.auth.write().await;
        auth.authenticated = true;
        auth.user_id = user_id;
        auth.role = Some(role);
        auth.auth_method = Some(auth_method.to_owned());
    }

    pub async fn touch(&self) {
        *self.last_seen.write().await = Utc::now();
    }

    pub async fn last_seen(&self) -> DateTime<Utc> {
        *self.last_seen.read().await
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<String, Arc<ClientRecord>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, client_id: String, remote_addr: String) -> Arc<ClientRecord> {
        let record = Arc::new(ClientRecord::new(client_id.clone(), remote_addr));
        self.clients.write().await.insert(client_id, record.clone());
        record
    }

    pub async fn unregister(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }

    pub async fn get(&self, client_id: &str) -> Option<Arc<ClientRecord>> {
        self.clients.read().await.get(client_id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn update_last_seen(&self, client_id: &str) {
        if let Some(record) = self.get(client_id).await {
            record.touch().await;
        }
    }
}
