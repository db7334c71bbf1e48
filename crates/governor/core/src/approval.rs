//! Multi-factor approval workflow.
//!
//! `PENDING → APPROVED | REJECTED`, both terminal. A pending request goes
//! stale after `timeout_ms`; staleness is evaluated lazily by readers and
//! never written back, so `get` and `pending_count` report expired requests
//! as rejected without mutating anything.

use std::collections::{BTreeMap, HashMap};

use governor_types::{ApprovalRequest, ApprovalStatus};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ApprovalConfig;
use crate::error::{GovernorError, GovernorResult};

pub struct ApprovalWorkflow {
    config: ApprovalConfig,
    requests: HashMap<String, ApprovalRequest>,
}

impl ApprovalWorkflow {
    pub fn new(config: ApprovalConfig) -> Self {
        Self {
            config,
            requests: HashMap::new(),
        }
    }

    /// Open a request using the configured number of factors.
    pub fn request(
        &mut self,
        operation_id: &str,
        operation: &str,
        origin: &str,
        now_ms: i64,
    ) -> ApprovalRequest {
        let required = self.config.required_factors;
        self.request_with(operation_id, operation, origin, required, now_ms)
    }

    /// Open a request needing `required_factors` factors.
    ///
    /// The first factor (authentication of the submitter) is satisfied at
    /// creation and counts as one of the required approvals.
    pub fn request_with(
        &mut self,
        operation_id: &str,
        operation: &str,
        origin: &str,
        required_factors: u32,
        now_ms: i64,
    ) -> ApprovalRequest {
        let required = required_factors.max(1);
        let factors: BTreeMap<String, bool> = (0..required as usize)
            .map(|i| (self.factor_name(i), i == 0))
            .collect();

        let status = if required == 1 {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        };

        let request = ApprovalRequest {
            id: format!("apr-{}", Uuid::new_v4()),
            operation_id: operation_id.to_string(),
            operation: operation.to_string(),
            origin: origin.to_string(),
            status,
            factors,
            approvals_received: 1,
            approvals_required: required,
            created_at: now_ms,
            timeout_ms: self.config.timeout_ms,
        };

        info!(
            approval_id = %request.id,
            operation = operation,
            required = required,
            "Approval requested"
        );

        self.requests.insert(request.id.clone(), request.clone());
        request
    }

    /// Record one factor decision.
    ///
    /// Approvals count only on a false→true change. A rejection that arrives
    /// before any factor has been approved by submission rejects the whole
    /// request; a later rejection only withdraws that factor.
    pub fn submit_factor(
        &mut self,
        approval_id: &str,
        factor: &str,
        approved: bool,
        now_ms: i64,
    ) -> GovernorResult<ApprovalRequest> {
        let request = self
            .requests
            .get_mut(approval_id)
            .ok_or_else(|| GovernorError::ApprovalNotFound(approval_id.to_string()))?;

        if request.status.is_terminal() {
            return Err(GovernorError::ApprovalAlreadyResolved {
                approval_id: approval_id.to_string(),
                status: format!("{:?}", request.status).to_uppercase(),
            });
        }
        if request.is_expired(now_ms) {
            return Err(GovernorError::ApprovalExpired(approval_id.to_string()));
        }

        let satisfied =
            request
                .factors
                .get_mut(factor)
                .ok_or_else(|| GovernorError::UnknownFactor {
                    approval_id: approval_id.to_string(),
                    factor: factor.to_string(),
                })?;

        if approved {
            if !*satisfied {
                *satisfied = true;
                request.approvals_received += 1;
            }
            if request.all_factors_satisfied() {
                request.status = ApprovalStatus::Approved;
            }
        } else {
            // Terminal only while no submitted approval stands. A withdrawn
            // approval leaves the count, so a rejection after approve-then-withdraw
            // rejects like a first rejection.
            let none_submitted = request.approvals_received <= 1;
            if *satisfied {
                *satisfied = false;
                request.approvals_received = request.approvals_received.saturating_sub(1);
            }
            if none_submitted {
                request.status = ApprovalStatus::Rejected;
            }
        }

        debug!(
            approval_id = approval_id,
            factor = factor,
            approved = approved,
            received = request.approvals_received,
            status = ?request.status,
            "Approval factor submitted"
        );

        Ok(request.clone())
    }

    /// Snapshot of a request as readers should see it: expired requests read as rejected.
    pub fn get(&self, approval_id: &str, now_ms: i64) -> GovernorResult<ApprovalRequest> {
        let request = self
            .requests
            .get(approval_id)
            .ok_or_else(|| GovernorError::ApprovalNotFound(approval_id.to_string()))?;
        let mut snapshot = request.clone();
        snapshot.status = request.effective_status(now_ms);
        Ok(snapshot)
    }

    /// Requests still pending and not yet expired.
    pub fn pending_count(&self, now_ms: i64) -> usize {
        self.requests
            .values()
            .filter(|r| r.effective_status(now_ms) == ApprovalStatus::Pending)
            .count()
    }

    /// Drop resolved and expired requests. Returns the ids removed.
    pub fn prune(&mut self, now_ms: i64) -> Vec<String> {
        let stale: Vec<String> = self
            .requests
            .values()
            .filter(|r| r.effective_status(now_ms) != ApprovalStatus::Pending)
            .map(|r| r.id.clone())
            .collect();
        for id in &stale {
            self.requests.remove(id);
        }
        stale
    }

    /// Discard every request. Returns how many were still pending.
    pub fn clear(&mut self, now_ms: i64) -> usize {
        let pending = self.pending_count(now_ms);
        self.requests.clear();
        pending
    }

    fn factor_name(&self, index: usize) -> String {
        self.config
            .factor_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("factor_{}", index + 1))
    }
}

impl Default for ApprovalWorkflow {
    fn default() -> Self {
        Self::new(ApprovalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(workflow: &mut ApprovalWorkflow) -> ApprovalRequest {
        workflow.request("op-1", "sector_isolation", "grid-loop", 1_000)
    }

    #[test]
    fn request_seeds_authentication() {
        let mut workflow = ApprovalWorkflow::default();
        let request = open(&mut workflow);
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.approvals_received, 1);
        assert_eq!(request.approvals_required, 3);
        assert!(request.factors["authentication"]);
        assert!(!request.factors["operator_signoff"]);
        assert!(!request.factors["safety_officer_signoff"]);
    }

    #[test]
    fn extra_factors_are_generated() {
        let mut workflow = ApprovalWorkflow::default();
        let request = workflow.request_with("op-1", "x", "y", 5, 0);
        assert!(request.factors.contains_key("factor_4"));
        assert!(request.factors.contains_key("factor_5"));
    }

    #[test]
    fn all_factors_approve() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        let step = workflow.submit_factor(&id, "operator_signoff", true, 2_000).unwrap();
        assert_eq!(step.status, ApprovalStatus::Pending);
        let done = workflow
            .submit_factor(&id, "safety_officer_signoff", true, 3_000)
            .unwrap();
        assert_eq!(done.status, ApprovalStatus::Approved);
        assert_eq!(done.approvals_received, 3);
    }

    #[test]
    fn rejection_first_rejects() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        let rejected = workflow
            .submit_factor(&id, "operator_signoff", false, 2_000)
            .unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);

        let err = workflow
            .submit_factor(&id, "safety_officer_signoff", true, 2_500)
            .unwrap_err();
        assert!(matches!(err, GovernorError::ApprovalAlreadyResolved { .. }));
    }

    #[test]
    fn late_rejection_withdraws_factor() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        workflow.submit_factor(&id, "operator_signoff", true, 2_000).unwrap();
        let step = workflow
            .submit_factor(&id, "operator_signoff", false, 2_100)
            .unwrap();
        assert_eq!(step.status, ApprovalStatus::Pending);
        assert_eq!(step.approvals_received, 1);
    }

    #[test]
    fn rejection_after_withdrawn_approval_rejects() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        workflow.submit_factor(&id, "operator_signoff", true, 2_000).unwrap();
        workflow.submit_factor(&id, "operator_signoff", false, 2_100).unwrap();
        let rejected = workflow
            .submit_factor(&id, "safety_officer_signoff", false, 2_200)
            .unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
    }

    #[test]
    fn rejection_with_a_standing_approval_stays_pending() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        workflow.submit_factor(&id, "operator_signoff", true, 2_000).unwrap();
        let step = workflow
            .submit_factor(&id, "safety_officer_signoff", false, 2_100)
            .unwrap();
        assert_eq!(step.status, ApprovalStatus::Pending);
        assert_eq!(step.approvals_received, 2);
    }

    #[test]
    fn repeated_approval_counts_once() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        workflow.submit_factor(&id, "operator_signoff", true, 2_000).unwrap();
        let again = workflow.submit_factor(&id, "operator_signoff", true, 2_100).unwrap();
        assert_eq!(again.approvals_received, 2);
        assert_eq!(again.status, ApprovalStatus::Pending);
    }

    #[test]
    fn unknown_id_and_factor() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        assert!(matches!(
            workflow.submit_factor("apr-missing", "operator_signoff", true, 0),
            Err(GovernorError::ApprovalNotFound(_))
        ));
        assert!(matches!(
            workflow.submit_factor(&id, "retina_scan", true, 0),
            Err(GovernorError::UnknownFactor { .. })
        ));
    }

    #[test]
    fn expiry_is_lazy() {
        let mut workflow = ApprovalWorkflow::default();
        let id = open(&mut workflow).id;
        let deadline = 1_000 + 300_000;

        assert_eq!(workflow.get(&id, deadline).unwrap().status, ApprovalStatus::Pending);
        assert_eq!(
            workflow.get(&id, deadline + 1).unwrap().status,
            ApprovalStatus::Rejected
        );
        assert_eq!(workflow.pending_count(deadline + 1), 0);
        assert!(matches!(
            workflow.submit_factor(&id, "operator_signoff", true, deadline + 1),
            Err(GovernorError::ApprovalExpired(_))
        ));

        // Reading did not transition the stored request.
        assert_eq!(workflow.get(&id, deadline).unwrap().status, ApprovalStatus::Pending);
    }

    #[test]
    fn prune_drops_resolved_and_expired() {
        let mut workflow = ApprovalWorkflow::default();
        let live = open(&mut workflow).id;
        let rejected = open(&mut workflow).id;
        workflow
            .submit_factor(&rejected, "operator_signoff", false, 2_000)
            .unwrap();

        let removed = workflow.prune(2_000);
        assert_eq!(removed, vec![rejected]);
        assert!(workflow.get(&live, 2_000).is_ok());

        assert_eq!(workflow.prune(1_000_000), vec![live]);
        assert_eq!(workflow.clear(1_000_000), 0);
    }

    #[test]
    fn single_factor_request_is_approved_at_creation() {
        let mut workflow = ApprovalWorkflow::default();
        let request = workflow.request_with("op-1", "x", "y", 1, 0);
        assert_eq!(request.status, ApprovalStatus::Approved);
    }
}
