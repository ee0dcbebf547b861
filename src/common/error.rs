//! Error types for parking_rrt

use thiserror::Error;

/// Main error type for the planner
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Obstacle or footprint geometry is malformed
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    /// Vertex id is not (or no longer) part of the tree
    #[error("Unknown vertex: {0}")]
    UnknownVertex(usize),
    /// The root vertex anchors the tree and cannot be removed
    #[error("The root vertex cannot be removed")]
    RootRemoval,
    /// A trajectory was requested before any target was reached
    #[error("Planning error: target not reached")]
    TargetNotReached,
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::InvalidParameter("increment must be positive".to_string());
        assert_eq!(format!("{}", err), "Invalid parameter: increment must be positive");
        assert_eq!(format!("{}", PlannerError::UnknownVertex(7)), "Unknown vertex: 7");
    }

    #[test]
    fn test_error_result_alias() {
        fn fails() -> PlannerResult<()> {
            Err(PlannerError::TargetNotReached)
        }
        assert!(matches!(fails(), Err(PlannerError::TargetNotReached)));
    }
}
