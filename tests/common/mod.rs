use std::sync::Arc;

use storefront_core::{
    config::AppConfig,
    events::{self, EventSender},
    store::{DocumentStore, MemoryStore},
    AppState,
};
use tokio::sync::mpsc;

/// Helper harness for spinning up an application state backed by the
/// in-memory document store.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh store state.
    pub async fn new() -> Self {
        let config = AppConfig::default();
        let store = Arc::new(MemoryStore::new());

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer_size);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(store, config, event_sender);

        Self {
            state,
            _event_task: event_task,
        }
    }

    /// Direct handle on the underlying store, for raw document assertions.
    #[allow(dead_code)]
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.state.store.clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
