use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Member '{name}' not found")]
    MemberNotFound { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type DashResult<T> = Result<T, DashError>;
