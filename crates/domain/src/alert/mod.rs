//! Alert events emitted when rules fire or recover.

pub mod entity;
pub mod error;

pub use entity::{ALERT_BACK_TO_NORMAL, ALERT_LEVEL, ALERT_PATTERN, AlertEvent};
pub use error::AlertError;
