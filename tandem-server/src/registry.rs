use dashmap::DashMap;
use std::sync::Arc;
use tandem_common::{Result, TandemError};
use tandem_mirror::protocol::ServerEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound channels of live sessions, keyed by session id.
#[derive(Default, Clone)]
pub struct SessionRegistry {
    by_id: Arc<DashMap<Uuid, mpsc::Sender<ServerEvent>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: Uuid, outbound: mpsc::Sender<ServerEvent>) {
        self.by_id.insert(id, outbound);
    }

    pub fn remove(&self, id: &Uuid) {
        self.by_id.remove(id);
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.by_id.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Tell a session's client to navigate away.
    pub async fn redirect(&self, id: Uuid, url: impl Into<String>) -> Result<()> {
        let outbound = self
            .by_id
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(TandemError::SessionNotFound(id))?;
        outbound
            .send(ServerEvent::Redirect { url: url.into() })
            .await
            .map_err(|_| TandemError::ChannelClosed)
    }
}
