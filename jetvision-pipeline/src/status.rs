//! The flight-request status lifecycle and who may move it.
//!
//! pending → under_review → rfq_submitted → quote_received → proposal_ready
//! → proposal_sent → accepted | declined, with cancelled reachable from any
//! non-terminal state. Managers drive the sourcing half of the pipeline,
//! ISOs the client-facing half.

use jetvision_core::identity::Role;
use jetvision_core::request::RequestStatus;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Role {role} may not move a request to {to}")]
    Forbidden { role: String, to: String },
}

/// The role allowed to perform a given forward transition, or `None` when
/// the edge does not exist in the pipeline.
fn transition_owner(from: RequestStatus, to: RequestStatus) -> Option<Role> {
    use RequestStatus::*;
    match (from, to) {
        (Pending, UnderReview) => Some(Role::Manager),
        (UnderReview, RfqSubmitted) => Some(Role::Manager),
        (RfqSubmitted, QuoteReceived) => Some(Role::Manager),
        (QuoteReceived, ProposalReady) => Some(Role::Manager),
        (ProposalReady, ProposalSent) => Some(Role::Iso),
        (ProposalSent, Accepted) => Some(Role::Iso),
        (ProposalSent, Declined) => Some(Role::Iso),
        _ => None,
    }
}

/// Check that `role` may move a request from `current` to `target`.
pub fn validate_transition(
    current: RequestStatus,
    target: RequestStatus,
    role: Role,
) -> Result<(), StatusError> {
    if target == RequestStatus::Cancelled {
        if current.is_terminal() {
            return Err(StatusError::InvalidTransition {
                from: current.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        if role != Role::Iso {
            return Err(StatusError::Forbidden {
                role: role.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        return Ok(());
    }

    match transition_owner(current, target) {
        None => Err(StatusError::InvalidTransition {
            from: current.as_str().to_string(),
            to: target.as_str().to_string(),
        }),
        Some(owner) if owner != role => Err(StatusError::Forbidden {
            role: role.as_str().to_string(),
            to: target.as_str().to_string(),
        }),
        Some(_) => Ok(()),
    }
}

/// All targets reachable from `current` by `role`. Drives which actions the
/// UI exposes.
pub fn available_transitions(current: RequestStatus, role: Role) -> Vec<RequestStatus> {
    use RequestStatus::*;
    [
        Pending,
        UnderReview,
        RfqSubmitted,
        QuoteReceived,
        ProposalReady,
        ProposalSent,
        Accepted,
        Declined,
        Cancelled,
    ]
    .into_iter()
    .filter(|target| validate_transition(current, *target, role).is_ok())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn test_full_forward_path() {
        assert!(validate_transition(Pending, UnderReview, Role::Manager).is_ok());
        assert!(validate_transition(UnderReview, RfqSubmitted, Role::Manager).is_ok());
        assert!(validate_transition(RfqSubmitted, QuoteReceived, Role::Manager).is_ok());
        assert!(validate_transition(QuoteReceived, ProposalReady, Role::Manager).is_ok());
        assert!(validate_transition(ProposalReady, ProposalSent, Role::Iso).is_ok());
        assert!(validate_transition(ProposalSent, Accepted, Role::Iso).is_ok());
        assert!(validate_transition(ProposalSent, Declined, Role::Iso).is_ok());
    }

    #[test]
    fn test_backward_transitions_rejected() {
        let result = validate_transition(ProposalSent, QuoteReceived, Role::Manager);
        assert!(matches!(
            result,
            Err(StatusError::InvalidTransition { .. })
        ));
        assert!(validate_transition(QuoteReceived, Pending, Role::Manager).is_err());
        assert!(validate_transition(Accepted, ProposalSent, Role::Iso).is_err());
    }

    #[test]
    fn test_role_ownership() {
        // Sourcing transitions belong to managers.
        assert!(matches!(
            validate_transition(Pending, UnderReview, Role::Iso),
            Err(StatusError::Forbidden { .. })
        ));
        // Client-facing transitions belong to ISOs.
        assert!(matches!(
            validate_transition(ProposalReady, ProposalSent, Role::Manager),
            Err(StatusError::Forbidden { .. })
        ));
        assert!(matches!(
            validate_transition(ProposalSent, Accepted, Role::Manager),
            Err(StatusError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_cancel_from_any_non_terminal_state_iso_only() {
        for status in [
            Pending,
            UnderReview,
            RfqSubmitted,
            QuoteReceived,
            ProposalReady,
            ProposalSent,
        ] {
            assert!(validate_transition(status, Cancelled, Role::Iso).is_ok());
            assert!(validate_transition(status, Cancelled, Role::Manager).is_err());
        }
        for status in [Accepted, Declined, Cancelled] {
            assert!(validate_transition(status, Cancelled, Role::Iso).is_err());
        }
    }

    #[test]
    fn test_only_forward_or_cancel_reachable() {
        for (status, role, expected) in [
            (Pending, Role::Manager, vec![UnderReview]),
            (Pending, Role::Iso, vec![Cancelled]),
            (RfqSubmitted, Role::Manager, vec![QuoteReceived]),
            (ProposalSent, Role::Iso, vec![Accepted, Declined, Cancelled]),
            (Accepted, Role::Iso, vec![]),
            (Cancelled, Role::Manager, vec![]),
        ] {
            assert_eq!(available_transitions(status, role), expected);
        }
    }
}
