pub mod broadcast_dispatcher;
pub mod log_dispatcher;

pub use broadcast_dispatcher::BroadcastDispatcher;
pub use log_dispatcher::LogAlertDispatcher;
