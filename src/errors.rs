use serde::Serialize;

use crate::store::StoreError;

/// Service-level error taxonomy shared by every service in the crate.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    StoreError(
        #[from]
        #[serde(skip)]
        StoreError,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Message suitable for surfacing to an end user. Internal failures are
    /// collapsed to a generic message so store/backend detail never leaks
    /// into an alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::StoreError(_)
            | Self::InternalError(_)
            | Self::SerializationError(_)
            | Self::EventError(_)
            | Self::Other(_) => "Something went wrong. Please try again.".to_string(),
            _ => self.to_string(),
        }
    }

    /// True when the underlying store rejected the operation on access rules.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::StoreError(StoreError::PermissionDenied(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_internal_details() {
        let err = ServiceError::StoreError(StoreError::Backend("socket reset".into()));
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");

        let err = ServiceError::InternalError("bug".into());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }

    #[test]
    fn user_message_keeps_user_facing_detail() {
        let err = ServiceError::NotFound("Cart c1 not found".into());
        assert_eq!(err.user_message(), "Not found: Cart c1 not found");

        let err = ServiceError::Forbidden("You do not have permission to rate this item".into());
        assert_eq!(
            err.user_message(),
            "Forbidden: You do not have permission to rate this item"
        );
    }

    #[test]
    fn store_permission_errors_are_detectable() {
        let err: ServiceError = StoreError::PermissionDenied("rules".into()).into();
        assert!(err.is_permission_denied());
        assert!(!ServiceError::NotFound("x".into()).is_permission_denied());
    }
}
