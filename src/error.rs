//! Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced synchronously by scheduler API calls
///
/// A failing task is not a scheduler error: executor failures become the
/// task's terminal `Failure` state and are delivered to subscribers.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("task '{id}' was already submitted to this scheduler")]
    DuplicateTask { id: Uuid },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

/// Result type alias for scheduler operations
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::InvalidConfiguration {
            reason: "max_concurrent must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_concurrent must be at least 1"
        );
    }

    #[test]
    fn test_duplicate_display_names_task() {
        let id = Uuid::new_v4();
        let err = SchedulerError::DuplicateTask { id };
        assert!(err.to_string().contains(&id.to_string()));
    }
}
