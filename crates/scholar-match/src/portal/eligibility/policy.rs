use std::cmp::Ordering;

use super::super::domain::Scholarship;
use super::config::MatchPolicy;
use super::{CheckOutcome, Criterion, EligibilityCheck};

pub(crate) fn decide(checks: &[EligibilityCheck], policy: &MatchPolicy) -> bool {
    checks.iter().all(|check| match check.outcome {
        CheckOutcome::Satisfied | CheckOutcome::Unrestricted => true,
        CheckOutcome::Unknown => policy.unknown_is_eligible,
        CheckOutcome::Unsatisfied => {
            check.criterion == Criterion::Deadline && policy.include_closed
        }
    })
}

/// Highest award first; unknown amounts sink. Ties go to the earliest deadline, then title.
pub(crate) fn by_award(left: &Scholarship, right: &Scholarship) -> Ordering {
    let amount = match (left.amount, right.amount) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    let deadline = match (left.deadline, right.deadline) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    amount
        .then(deadline)
        .then_with(|| left.title.cmp(&right.title))
}

pub(crate) fn newest_first(left: &Scholarship, right: &Scholarship) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| left.id.cmp(&right.id))
}
