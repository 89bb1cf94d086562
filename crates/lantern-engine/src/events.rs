use lantern_core::{Message, MessageCluster};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events the engine exposes to the renderer. `ClusterChanged` with
/// `cluster: None` is the empty-store placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ClusterChanged {
        cluster: Option<MessageCluster>,
    },
    WorkingSetChanged {
        removed: Vec<i64>,
        added: Vec<Message>,
    },
}

impl EngineEvent {
    /// Stable name used for SSE event framing.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::ClusterChanged { .. } => "cluster_changed",
            EngineEvent::WorkingSetChanged { .. } => "working_set_changed",
        }
    }
}

/// Broadcast bus for engine events. Publishing never blocks; slow
/// subscribers lag and drop under broadcast semantics.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: EngineEvent) {
        // Send only fails with no subscribers, which is fine.
        let _ = self.tx.send(event);
    }
}
