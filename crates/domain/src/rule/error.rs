use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid period syntax: {0}")]
    InvalidPeriodSyntax(String),
}
