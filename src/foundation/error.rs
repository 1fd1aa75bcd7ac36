/// Convenience result type used across scenestack.
pub type StackResult<T> = Result<T, StackError>;

/// Top-level error taxonomy used by the library.
#[derive(thiserror::Error, Debug)]
pub enum StackError {
    /// Invalid user-provided document data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid or unsampleable animation description.
    #[error("animation error: {0}")]
    Animation(String),

    /// Failure while resolving, compiling or rendering a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Failure while reading or writing serialized documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackError {
    /// Build a [`StackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StackError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`StackError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`StackError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for StackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
