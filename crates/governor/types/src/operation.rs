use serde::{Deserialize, Serialize};

// ── Request ─────────────────────────────────────────────────────────────

/// An operation submitted to the governor for evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Kind of control operation (e.g. `energy_reallocation`).
    pub operation_type: String,
    /// Identity of the submitting actor or loop.
    pub origin: String,
    /// Resource domain the operation touches.
    pub sector: String,
    /// Share of the resource requested, in percent.
    pub resource_request_pct: f64,
    /// Quota key charged by this operation. `None` means no quota is consumed.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Caller-declared high-impact flag; forces the approval workflow.
    #[serde(default)]
    pub high_risk: bool,
}

impl OperationRequest {
    pub fn new(
        operation_type: impl Into<String>,
        origin: impl Into<String>,
        sector: impl Into<String>,
        resource_request_pct: f64,
    ) -> Self {
        Self {
            operation_type: operation_type.into(),
            origin: origin.into(),
            sector: sector.into(),
            resource_request_pct,
            resource_type: None,
            high_risk: false,
        }
    }

    /// Charge the request against a quota key.
    pub fn with_resource(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Mark the request as high-risk.
    pub fn high_risk(mut self) -> Self {
        self.high_risk = true;
        self
    }
}

// ── Decision ────────────────────────────────────────────────────────────

/// Outcome recorded for an evaluated operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allowed,
    Denied,
    Pending,
}

/// Why an operation was denied. Denials are expected outcomes, not errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    EmergencyStop {
        reason: String,
    },
    RateLimited {
        operation_type: String,
        count: usize,
        limit: usize,
        window_ms: i64,
    },
    QuotaExceeded {
        resource_type: String,
        requested_pct: f64,
        available_pct: f64,
    },
    AnomalyDetected {
        description: String,
    },
    ApprovalRejected {
        approval_id: String,
    },
    MalformedRequest {
        detail: String,
    },
    GovernorShutDown,
}

impl DenialReason {
    /// Short machine-friendly label.
    pub fn label(&self) -> &'static str {
        match self {
            DenialReason::EmergencyStop { .. } => "emergency_stop",
            DenialReason::RateLimited { .. } => "rate_limited",
            DenialReason::QuotaExceeded { .. } => "quota_exceeded",
            DenialReason::AnomalyDetected { .. } => "anomaly_detected",
            DenialReason::ApprovalRejected { .. } => "approval_rejected",
            DenialReason::MalformedRequest { .. } => "malformed_request",
            DenialReason::GovernorShutDown => "governor_shut_down",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::EmergencyStop { reason } => {
                write!(f, "emergency stop engaged: {reason}")
            }
            DenialReason::RateLimited {
                operation_type,
                count,
                limit,
                window_ms,
            } => write!(
                f,
                "rate limit exceeded for {operation_type}: {count}/{limit} within {window_ms}ms"
            ),
            DenialReason::QuotaExceeded {
                resource_type,
                requested_pct,
                available_pct,
            } => write!(
                f,
                "quota exceeded for {resource_type}: requested {requested_pct:.2}%, \
                 available {available_pct:.2}%"
            ),
            DenialReason::AnomalyDetected { description } => {
                write!(f, "anomaly detected: {description}")
            }
            DenialReason::ApprovalRejected { approval_id } => {
                write!(f, "approval {approval_id} rejected")
            }
            DenialReason::MalformedRequest { detail } => write!(f, "malformed request: {detail}"),
            DenialReason::GovernorShutDown => write!(f, "governor is shut down"),
        }
    }
}

// ── Record ──────────────────────────────────────────────────────────────

/// Immutable record of one `evaluate()` call, written to the audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation_id: String,
    pub operation_type: String,
    pub origin: String,
    pub sector: String,
    pub resource_type: Option<String>,
    pub resource_request_pct: f64,
    pub timestamp_ms: i64,
    /// True only when the operation was allowed to take effect.
    pub approved: bool,
    pub decision: Decision,
    pub reason: String,
    pub anomalous: bool,
    pub approval_id: Option<String>,
    pub rollback_timer_id: Option<String>,
}

impl OperationRecord {
    /// Whether the operation was admitted into the pipeline (allowed or pending).
    pub fn is_accepted(&self) -> bool {
        self.decision != Decision::Denied
    }
}

// ── Result ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    Allowed,
    Denied,
    Pending,
}

/// Verdict returned synchronously to the caller of `evaluate()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub operation_id: String,
    pub status: EvaluationStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_timer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<DenialReason>,
}

impl EvaluationResult {
    pub fn allowed(
        operation_id: impl Into<String>,
        reason: impl Into<String>,
        rollback_timer_id: String,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            status: EvaluationStatus::Allowed,
            reason: reason.into(),
            rollback_timer_id: Some(rollback_timer_id),
            approval_id: None,
            denial: None,
        }
    }

    pub fn denied(operation_id: impl Into<String>, denial: DenialReason) -> Self {
        Self {
            operation_id: operation_id.into(),
            status: EvaluationStatus::Denied,
            reason: denial.to_string(),
            rollback_timer_id: None,
            approval_id: None,
            denial: Some(denial),
        }
    }

    pub fn pending(
        operation_id: impl Into<String>,
        reason: impl Into<String>,
        approval_id: String,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            status: EvaluationStatus::Pending,
            reason: reason.into(),
            rollback_timer_id: None,
            approval_id: Some(approval_id),
            denial: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.status == EvaluationStatus::Allowed
    }

    pub fn is_denied(&self) -> bool {
        self.status == EvaluationStatus::Denied
    }

    pub fn is_pending(&self) -> bool {
        self.status == EvaluationStatus::Pending
    }

    /// The recorded decision corresponding to this result.
    pub fn decision(&self) -> Decision {
        match self.status {
            EvaluationStatus::Allowed => Decision::Allowed,
            EvaluationStatus::Denied => Decision::Denied,
            EvaluationStatus::Pending => Decision::Pending,
        }
    }
}
