#![forbid(unsafe_code)]

pub mod alert;
pub mod query;
pub mod record;
pub mod rule;
