use crate::error::ReviewError;
use crate::models::{Decision, InternshipStatus, ReportStatus};

pub fn review_internship(
    current: InternshipStatus,
    decision: Decision,
) -> Result<InternshipStatus, ReviewError> {
    let next = match decision {
        Decision::Accept => InternshipStatus::Accepted,
        Decision::Reject => InternshipStatus::Rejected,
    };

    if current != InternshipStatus::Waiting {
        return Err(ReviewError::InvalidTransition {
            from: current.to_string(),
            to: next.to_string(),
        });
    }

    Ok(next)
}

pub fn review_report(current: ReportStatus, decision: Decision) -> Result<ReportStatus, ReviewError> {
    let next = match decision {
        Decision::Accept => ReportStatus::Approved,
        Decision::Reject => ReportStatus::Rejected,
    };

    if current != ReportStatus::Pending {
        return Err(ReviewError::InvalidTransition {
            from: current.to_string(),
            to: next.to_string(),
        });
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_internship_can_be_accepted_or_rejected() {
        assert_eq!(
            review_internship(InternshipStatus::Waiting, Decision::Accept),
            Ok(InternshipStatus::Accepted)
        );
        assert_eq!(
            review_internship(InternshipStatus::Waiting, Decision::Reject),
            Ok(InternshipStatus::Rejected)
        );
    }

    #[test]
    fn decided_internship_cannot_move_again() {
        let error = review_internship(InternshipStatus::Rejected, Decision::Accept).unwrap_err();
        assert_eq!(
            error,
            ReviewError::InvalidTransition {
                from: "rejected".to_string(),
                to: "accepted".to_string(),
            }
        );
        assert!(review_internship(InternshipStatus::Accepted, Decision::Reject).is_err());
    }

    #[test]
    fn only_pending_reports_are_reviewed() {
        assert_eq!(
            review_report(ReportStatus::Pending, Decision::Accept),
            Ok(ReportStatus::Approved)
        );
        assert_eq!(
            review_report(ReportStatus::Pending, Decision::Reject),
            Ok(ReportStatus::Rejected)
        );
        assert!(review_report(ReportStatus::Approved, Decision::Reject).is_err());
        assert!(review_report(ReportStatus::Rejected, Decision::Accept).is_err());
    }
}
