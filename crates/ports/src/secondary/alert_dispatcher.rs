use domain::alert::entity::AlertEvent;
use domain::alert::error::AlertError;

/// Secondary port for handing finished alerts to the outside world
/// (an event bus, a log, a broadcast channel).
pub trait AlertDispatcher: Send + Sync {
    /// Deliver one alert. Implementations decide delivery semantics;
    /// a failed delivery surfaces as an error and never panics.
    fn post(&self, event: &AlertEvent) -> Result<(), AlertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyDispatcher;
    impl AlertDispatcher for DummyDispatcher {
        fn post(&self, _event: &AlertEvent) -> Result<(), AlertError> {
            Ok(())
        }
    }

    #[test]
    fn alert_dispatcher_is_dyn_compatible() {
        let dispatcher: Box<dyn AlertDispatcher> = Box::new(DummyDispatcher);
        let _ = dispatcher;
    }
}
