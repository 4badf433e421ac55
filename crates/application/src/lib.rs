#![forbid(unsafe_code)]

pub mod alert_handler;

pub use alert_handler::AlertHandler;
