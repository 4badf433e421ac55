use domain::alert::entity::AlertEvent;
use domain::alert::error::AlertError;
use ports::secondary::alert_dispatcher::AlertDispatcher;
use tokio::sync::broadcast;

/// Dispatcher fanning alerts out over a tokio broadcast channel, for
/// in-process consumers (forwarders, future API surfaces).
///
/// Delivery is best effort: posting with no live subscriber is not an
/// error, and slow subscribers lose the oldest alerts.
pub struct BroadcastDispatcher {
    tx: broadcast::Sender<AlertEvent>,
}

impl BroadcastDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }
}

impl AlertDispatcher for BroadcastDispatcher {
    fn post(&self, event: &AlertEvent) -> Result<(), AlertError> {
        // send only fails when there is no subscriber.
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}
