//! Result Aggregator
//!
//! Pure folds from item statuses to an [`AggregatedStatus`]. The aggregate is
//! never stored; callers recompute it from the current item set.

use cdnbulk_domain::constants::PARTIAL_CANCELLATION_NOTE;
use cdnbulk_domain::{AggregatedStatus, ItemState, ItemStatus, JobId, JobRecord, OverallState};

/// Classify `items` and compute progress counters.
///
/// Precedence: any non-terminal item makes the job `IN_PROGRESS` (or
/// `PENDING` while every item is still `SUBMITTED`); otherwise all completed
/// is `COMPLETED`, all failed is `FAILED`, and a mix is `PARTIALLY_FAILED`.
/// A job without items is `PENDING`.
pub fn aggregate(job_id: &JobId, items: &[ItemStatus]) -> AggregatedStatus {
    let total = items.len();
    let mut completed = 0;
    let mut failed = 0;
    let mut submitted = 0;
    let mut in_progress = 0;

    for item in items {
        match item.state {
            ItemState::Completed => completed += 1,
            ItemState::Failed => failed += 1,
            ItemState::Submitted => submitted += 1,
            ItemState::InProgress => in_progress += 1,
        }
    }
    let pending = submitted + in_progress;

    let overall_state = if total == 0 || submitted == total {
        OverallState::Pending
    } else if pending > 0 {
        OverallState::InProgress
    } else if completed == total {
        OverallState::Completed
    } else if failed == total {
        OverallState::Failed
    } else {
        OverallState::PartiallyFailed
    };

    AggregatedStatus {
        job_id: job_id.clone(),
        overall_state,
        total,
        completed,
        failed,
        in_progress: pending,
        completion_percentage: percentage(completed, total),
        note: None,
    }
}

/// Aggregate a registry record, applying its cancellation outcome.
///
/// A confirmed cancellation reports `CANCELLED` when nothing completed, and
/// `PARTIALLY_FAILED` with a note when some work had already landed.
pub fn aggregate_record(record: &JobRecord) -> AggregatedStatus {
    let mut status = aggregate(record.job_id(), &record.items);
    if record.cancelled && status.in_progress == 0 {
        if status.completed == 0 {
            status.overall_state = OverallState::Cancelled;
        } else {
            status.overall_state = OverallState::PartiallyFailed;
            status.note = Some(PARTIAL_CANCELLATION_NOTE.to_string());
        }
    }
    status
}

fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // completed <= total, so the quotient is at most 100
    u8::try_from(completed * 100 / total).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cdnbulk_domain::{OperationHandle, OperationType};

    use super::*;

    fn items(states: &[ItemState]) -> Vec<ItemStatus> {
        states
            .iter()
            .enumerate()
            .map(|(i, state)| ItemStatus { state: *state, ..ItemStatus::submitted(format!("item-{i}")) })
            .collect()
    }

    fn job() -> JobId {
        JobId::from("job-1")
    }

    #[test]
    fn all_completed() {
        let status = aggregate(&job(), &items(&[ItemState::Completed; 3]));
        assert_eq!(status.overall_state, OverallState::Completed);
        assert_eq!((status.completed, status.failed, status.in_progress), (3, 0, 0));
        assert_eq!(status.completion_percentage, 100);
    }

    #[test]
    fn mixed_with_pending_is_in_progress() {
        let status = aggregate(
            &job(),
            &items(&[
                ItemState::Completed,
                ItemState::Completed,
                ItemState::Failed,
                ItemState::InProgress,
            ]),
        );
        assert_eq!(status.overall_state, OverallState::InProgress);
        assert_eq!(status.completion_percentage, 50);
        assert_eq!(status.in_progress, 1);
    }

    #[test]
    fn all_submitted_is_pending() {
        let status = aggregate(&job(), &items(&[ItemState::Submitted; 4]));
        assert_eq!(status.overall_state, OverallState::Pending);
        assert_eq!(status.in_progress, 4);

        let status = aggregate(&job(), &items(&[ItemState::Submitted, ItemState::InProgress]));
        assert_eq!(status.overall_state, OverallState::InProgress);
    }

    #[test]
    fn terminal_classifications() {
        let failed = aggregate(&job(), &items(&[ItemState::Failed; 2]));
        assert_eq!(failed.overall_state, OverallState::Failed);

        let mixed = aggregate(&job(), &items(&[ItemState::Completed, ItemState::Failed, ItemState::Failed]));
        assert_eq!(mixed.overall_state, OverallState::PartiallyFailed);
        assert_eq!(mixed.completion_percentage, 33);
    }

    #[test]
    fn empty_job_is_pending() {
        let status = aggregate(&job(), &[]);
        assert_eq!(status.overall_state, OverallState::Pending);
        assert_eq!(status.completion_percentage, 0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let snapshot = items(&[ItemState::Completed, ItemState::InProgress, ItemState::Failed]);
        assert_eq!(aggregate(&job(), &snapshot), aggregate(&job(), &snapshot));
    }

    #[test]
    fn cancelled_record_classification() {
        let handle = OperationHandle {
            job_id: job(),
            operation_type: OperationType::Activation,
            submitted_at: Utc::now(),
            item_count: 2,
        };
        let mut record = JobRecord::submitted(handle, ["a", "b"]);
        record.cancelled = true;
        record.items[0].state = ItemState::Failed;
        record.items[1].state = ItemState::Failed;
        assert_eq!(aggregate_record(&record).overall_state, OverallState::Cancelled);

        record.items[0].state = ItemState::Completed;
        let status = aggregate_record(&record);
        assert_eq!(status.overall_state, OverallState::PartiallyFailed);
        assert_eq!(status.note.as_deref(), Some(PARTIAL_CANCELLATION_NOTE));
    }
}
