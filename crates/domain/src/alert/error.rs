use thiserror::Error;

use crate::query::QueryError;
use crate::rule::RuleError;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("record store operation failed: {0}")]
    StoreFailed(String),
    #[error("alert dispatch failed: {0}")]
    DispatchFailed(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}
