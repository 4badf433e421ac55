//! Alerting rule model: definitions loaded from configuration
//! dictionaries plus the check-period grammar.

pub mod entity;
pub mod error;
pub mod loader;
pub mod period;

pub use entity::Rule;
pub use error::RuleError;
pub use loader::{RULE_PREFIX, load};
pub use period::{oldest_period, parse_period};
