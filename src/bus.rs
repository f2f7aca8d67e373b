use crate::events::CrewEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CrewEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrewEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: CrewEvent) -> Result<usize, broadcast::error::SendError<CrewEvent>> {
        self.tx.send(event)
    }
}
