//! InMemory Connection Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Connection, ConnectionId, ConnectionRepository, RepositoryError, RoomId};

/// インメモリ Connection Repository 実装
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, connection: Connection) -> Result<(), RepositoryError> {
        let mut connections = self.connections.lock().await;
        if connections.contains_key(&connection.id) {
            return Err(RepositoryError::DuplicateConnection(
                connection.id.to_string(),
            ));
        }
        connections.insert(connection.id.clone(), connection);
        Ok(())
    }

    async fn record_join(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, RepositoryError> {
        let mut connections = self.connections.lock().await;
        let connection = connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        Ok(connection.join(room_id))
    }

    async fn get(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let connections = self.connections.lock().await;
        connections.get(connection_id).cloned()
    }

    async fn remove(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let mut connections = self.connections.lock().await;
        connections.remove(connection_id)
    }

    async fn all_ids(&self) -> Vec<ConnectionId> {
        let connections = self.connections.lock().await;
        let mut ids: Vec<ConnectionId> = connections.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn count(&self) -> usize {
        let connections = self.connections.lock().await;
        connections.len()
    }
}
