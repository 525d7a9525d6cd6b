use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KoperasiError {
    /// Loan terms that cannot produce an installment schedule.
    #[error("Invalid loan terms: {field}: {reason}")]
    InvalidTerms { field: String, reason: String },

    /// Allocation pool or SHU input that cannot be distributed.
    #[error("Invalid allocation pool: {field}: {reason}")]
    InvalidPool { field: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl KoperasiError {
    pub(crate) fn terms(field: impl Into<String>, reason: impl Into<String>) -> Self {
        KoperasiError::InvalidTerms {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn pool(field: impl Into<String>, reason: impl Into<String>) -> Self {
        KoperasiError::InvalidPool {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending input field, when the error is a validation failure.
    pub fn field(&self) -> Option<&str> {
        match self {
            KoperasiError::InvalidTerms { field, .. } | KoperasiError::InvalidPool { field, .. } => {
                Some(field.as_str())
            }
            KoperasiError::Serialization(_) => None,
        }
    }
}

impl From<serde_json::Error> for KoperasiError {
    fn from(e: serde_json::Error) -> Self {
        KoperasiError::Serialization(e.to_string())
    }
}
