use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },
}

impl QueryError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        QueryError::Syntax {
            position,
            message: message.into(),
        }
    }
}
