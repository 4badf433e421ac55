use domain::alert::entity::AlertEvent;
use domain::alert::error::AlertError;
use ports::secondary::alert_dispatcher::AlertDispatcher;

/// Dispatcher that logs alerts via tracing.
///
/// Used as the default dispatcher when no external destination is
/// configured.
pub struct LogAlertDispatcher;

impl AlertDispatcher for LogAlertDispatcher {
    fn post(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let properties = serde_json::to_string(&event.properties)
            .map_err(|e| AlertError::DispatchFailed(format!("serialize: {e}")))?;
        tracing::info!(
            topic = %event.topic,
            level = event.level().unwrap_or("UNKNOWN"),
            back_to_normal = event.is_back_to_normal(),
            %properties,
            "alert dispatched to log"
        );
        Ok(())
    }
}
