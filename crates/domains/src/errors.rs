//! # Errors
//!
//! `ForumError` is the closed set of error kinds a client can receive.
//! `DomainError` is what use-cases return: a batch of validation failures,
//! a single short-circuiting rule violation, or a store failure.

use thiserror::Error;

/// Wire-level error kinds. `name()` is the stable identifier clients match on;
/// `Display` is the human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForumError {
    #[error("missing parameter {name}")]
    MissingParameter { name: String },

    #[error("parameter {name} must be of type {expected}")]
    InvalidParameterType { name: String, expected: String },

    #[error("parameter {name} must be more than {min} characters")]
    ParameterLengthTooSmall { name: String, min: usize },

    #[error("parameter {name} must be less than {max} characters")]
    ParameterLengthTooLarge { name: String, max: usize },

    #[error("{reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("the request is not authorized")]
    RequestNotAuthorized,

    #[error("category does not exist")]
    InvalidCategory,

    #[error("invalid session token")]
    InvalidToken,

    #[error("category already exists")]
    CategoryAlreadyExists,

    #[error("account does not exist")]
    AccountDoesNotExist,

    #[error("an unknown error occurred")]
    Unknown,
}

impl ForumError {
    pub fn missing_parameter(name: &str) -> Self {
        ForumError::MissingParameter { name: name.to_string() }
    }

    pub fn invalid_parameter_type(name: &str, expected: &str) -> Self {
        ForumError::InvalidParameterType {
            name: name.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn parameter_length_too_small(name: &str, min: usize) -> Self {
        ForumError::ParameterLengthTooSmall { name: name.to_string(), min }
    }

    pub fn parameter_length_too_large(name: &str, max: usize) -> Self {
        ForumError::ParameterLengthTooLarge { name: name.to_string(), max }
    }

    pub fn invalid_parameter(name: &str, reason: &str) -> Self {
        ForumError::InvalidParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable camelCase identifier of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            ForumError::MissingParameter { .. } => "missingParameter",
            ForumError::InvalidParameterType { .. } => "invalidParameterType",
            ForumError::ParameterLengthTooSmall { .. } => "parameterLengthTooSmall",
            ForumError::ParameterLengthTooLarge { .. } => "parameterLengthTooLarge",
            ForumError::InvalidParameter { .. } => "invalidParameter",
            ForumError::RequestNotAuthorized => "requestNotAuthorized",
            ForumError::InvalidCategory => "invalidCategory",
            ForumError::InvalidToken => "invalidToken",
            ForumError::CategoryAlreadyExists => "categoryAlreadyExists",
            ForumError::AccountDoesNotExist => "accountDoesNotExist",
            ForumError::Unknown => "unknown",
        }
    }

    /// The request parameter the error refers to, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            ForumError::MissingParameter { name }
            | ForumError::InvalidParameterType { name, .. }
            | ForumError::ParameterLengthTooSmall { name, .. }
            | ForumError::ParameterLengthTooLarge { name, .. }
            | ForumError::InvalidParameter { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Authentication/authorization kinds, as opposed to bad input.
    pub fn is_auth(&self) -> bool {
        matches!(self, ForumError::RequestNotAuthorized | ForumError::InvalidToken)
    }
}

/// Persistence failures surfaced by repository adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (connection lost, query error, ...).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type RepoResult<T> = std::result::Result<T, RepoError>;

/// Error returned by every use-case in `services`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Every structural problem found in one input, collected before failing.
    #[error("validation failed with {} error(s)", .0.len())]
    Validation(Vec<ForumError>),

    /// A single domain rule that depends on earlier steps succeeding.
    #[error(transparent)]
    Rule(ForumError),

    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl From<ForumError> for DomainError {
    fn from(err: ForumError) -> Self {
        DomainError::Rule(err)
    }
}

/// A specialized Result type for forum use-cases.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_exposes_reason_as_message() {
        let err = ForumError::invalid_parameter("replyingToId", "replies must be in same thread");
        assert_eq!(err.name(), "invalidParameter");
        assert_eq!(err.parameter(), Some("replyingToId"));
        assert_eq!(err.to_string(), "replies must be in same thread");
    }

    #[test]
    fn validation_error_counts_its_entries() {
        let err = DomainError::Validation(vec![
            ForumError::missing_parameter("content"),
            ForumError::invalid_parameter_type("threadId", "integer"),
        ]);
        assert_eq!(err.to_string(), "validation failed with 2 error(s)");
    }

    #[test]
    fn auth_kinds_are_flagged() {
        assert!(ForumError::RequestNotAuthorized.is_auth());
        assert!(ForumError::InvalidToken.is_auth());
        assert!(!ForumError::InvalidCategory.is_auth());
        assert_eq!(ForumError::InvalidCategory.parameter(), None);
    }
}
