//! Session manager for tracking all connected consoles

use super::connection::SessionHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::RwLock;

/// What the node knows about one connected console
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub addr: SocketAddr,
    /// Sender id from the console's first request; empty until then
    pub client_id: String,
    pub connected_at: Instant,
    pub requests: u64,
}

/// Tracks every open console session
pub struct SessionManager {
    sessions: RwLock<HashMap<SocketAddr, SessionInfo>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, handle: &SessionHandle) {
        let info = SessionInfo {
            addr: handle.addr,
            client_id: String::new(),
            connected_at: handle.connected_at,
            requests: 0,
        };
        self.sessions.write().await.insert(handle.addr, info);
    }

    pub async fn unregister(&self, addr: &SocketAddr) {
        self.sessions.write().await.remove(addr);
    }

    /// Count a request and remember who sent it
    pub async fn record_request(&self, addr: &SocketAddr, client_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(info) = sessions.get_mut(addr) {
            if info.client_id.is_empty() {
                info.client_id = client_id.to_string();
            }
            info.requests += 1;
        }
    }

    pub async fn get(&self, addr: &SocketAddr) -> Option<SessionInfo> {
        self.sessions.read().await.get(addr).cloned()
    }

    /// Snapshot of all connected consoles
    pub async fn connected_clients(&self) -> Vec<SessionInfo> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
