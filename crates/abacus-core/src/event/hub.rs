use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::event::types::RuntimeEvent;
use crate::kernel::constants::DEFAULT_EVENT_HUB_CAPACITY;

/// Bounded fan-out of [`RuntimeEvent`]s. Publishing never blocks; a slow
/// subscriber loses the oldest events instead of stalling the runtime.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<RuntimeEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_HUB_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream`; lag shows up as `Err(BroadcastStreamRecvError::Lagged)` items
    pub fn stream(&self) -> BroadcastStream<RuntimeEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn emit(&self, event: RuntimeEvent) {
        log::debug!("runtime event {} for '{}'", event.name(), event.plugin_id());
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
