//! Service-level errors

use catalog_kernel::{CoreError, PortError};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by the application use cases
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The command carried a value the domain rejects
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// The command conflicts with data already stored
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (connection, timeout, unexpected database error)
    #[error(transparent)]
    Port(PortError),
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

impl From<CoreError> for ServiceError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(message) => ServiceError::Validation(message),
            CoreError::NotFound(id) => ServiceError::not_found("Entity", id),
            CoreError::Configuration(message) => ServiceError::Port(PortError::internal(message)),
        }
    }
}

impl From<PortError> for ServiceError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ServiceError::NotFound { entity: entity_type, id },
            PortError::Validation { message, .. } => ServiceError::Validation(message),
            PortError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Port(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_keeps_entity() {
        let error = ServiceError::from(PortError::not_found("Review", "abc"));
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Review not found: abc");
    }

    #[test]
    fn test_connection_failure_stays_a_port_error() {
        let error = ServiceError::from(PortError::connection("pool exhausted"));
        assert!(matches!(error, ServiceError::Port(ref e) if e.is_connection_error()));
    }

    #[test]
    fn test_core_validation_maps_to_validation() {
        let error = ServiceError::from(CoreError::validation("rating out of range"));
        assert!(matches!(error, ServiceError::Validation(_)));
    }
}
