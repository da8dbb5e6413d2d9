use std::sync::Arc;

use wabridge_db::BridgeDb;
use wabridge_ipc::NetworkClient;

/// Shared by every handler. The network side is generic so tests can swap
/// in a fake client.
pub struct AppState<N> {
    pub db: Arc<BridgeDb>,
    pub network: Arc<N>,
}

impl<N: NetworkClient> AppState<N> {
    pub fn new(db: Arc<BridgeDb>, network: Arc<N>) -> Self {
        Self { db, network }
    }
}

impl<N> Clone for AppState<N> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            network: self.network.clone(),
        }
    }
}
