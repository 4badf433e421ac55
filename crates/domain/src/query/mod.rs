pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{Bound, Query};
pub use error::QueryError;

/// Field a bare (unfielded) query term is matched against.
pub const CONTENT_FIELD: &str = "content";
