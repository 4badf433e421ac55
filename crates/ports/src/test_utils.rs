use std::sync::Mutex;

use domain::alert::entity::AlertEvent;
use domain::alert::error::AlertError;

use crate::secondary::alert_dispatcher::AlertDispatcher;

/// Dispatcher that records every posted alert for later assertions.
#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<AlertEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl AlertDispatcher for RecordingDispatcher {
    fn post(&self, event: &AlertEvent) -> Result<(), AlertError> {
        self.events
            .lock()
            .map_err(|_| AlertError::DispatchFailed("recording dispatcher poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
