pub mod alert_dispatcher;
pub mod record_store;

pub use alert_dispatcher::AlertDispatcher;
pub use record_store::RecordStore;
