use thiserror::Error;

/// Not-found and invalid-transition errors returned to callers.
///
/// Policy denials are never errors; they come back as
/// [`EvaluationResult`](governor_types::EvaluationResult) values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernorError {
    #[error("approval request not found: {0}")]
    ApprovalNotFound(String),

    #[error("unknown factor '{factor}' for approval {approval_id}")]
    UnknownFactor { approval_id: String, factor: String },

    #[error("approval {approval_id} already resolved as {status}")]
    ApprovalAlreadyResolved { approval_id: String, status: String },

    #[error("approval {0} expired")]
    ApprovalExpired(String),

    #[error("no active rollback timer for operation {0}")]
    RollbackNotFound(String),

    #[error("emergency stop engaged: {0}")]
    EmergencyStopEngaged(String),

    #[error("governor is shut down")]
    ShutDown,
}

impl GovernorError {
    /// Whether the error means the referenced item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GovernorError::ApprovalNotFound(_)
                | GovernorError::UnknownFactor { .. }
                | GovernorError::RollbackNotFound(_)
        )
    }
}

pub type GovernorResult<T> = Result<T, GovernorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GovernorError::UnknownFactor {
            approval_id: "apr-1".into(),
            factor: "retina_scan".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown factor 'retina_scan' for approval apr-1"
        );
    }

    #[test]
    fn not_found_classification() {
        assert!(GovernorError::RollbackNotFound("op".into()).is_not_found());
        assert!(!GovernorError::ApprovalExpired("apr".into()).is_not_found());
    }
}
