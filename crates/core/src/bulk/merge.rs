//! Monotonic application of remote item states
//!
//! Both functions are meant to run inside the registry's per-job critical
//! section so that concurrent polls cannot interleave partial writes.

use std::collections::HashMap;

use cdnbulk_domain::constants::CANCELLED_ITEM_MESSAGE;
use cdnbulk_domain::{ItemState, ItemStatus, RemoteItemStatus};
use chrono::{DateTime, Utc};

/// What a merge did to the local item set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Items whose state changed
    pub applied: usize,
    /// Remote reports ignored because they would move an item backwards
    pub ignored_regressions: usize,
    /// Remote item ids that match no local item
    pub unknown_items: Vec<String>,
}

/// Rank of a state along the forward path `SUBMITTED -> IN_PROGRESS -> terminal`
fn rank(state: ItemState) -> u8 {
    match state {
        ItemState::Submitted => 0,
        ItemState::InProgress => 1,
        ItemState::Completed | ItemState::Failed => 2,
    }
}

/// Apply `remote` onto `items` by item id.
///
/// Terminal items never change, and a non-terminal item never moves
/// backwards (an `IN_PROGRESS` item reported as `SUBMITTED` stays put).
/// Remote items with unknown ids are reported but otherwise ignored.
pub fn apply_remote_states(
    items: &mut [ItemStatus],
    remote: &[RemoteItemStatus],
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut targets = Vec::with_capacity(remote.len());
    {
        let positions: HashMap<&str, usize> =
            items.iter().enumerate().map(|(i, item)| (item.item_id.as_str(), i)).collect();
        for report in remote {
            match positions.get(report.item_id.as_str()) {
                Some(&position) => targets.push((position, report)),
                None => outcome.unknown_items.push(report.item_id.clone()),
            }
        }
    }

    for (position, report) in targets {
        let item = &mut items[position];
        if item.state == report.state {
            continue;
        }
        if item.state.is_terminal() || rank(report.state) < rank(item.state) {
            outcome.ignored_regressions += 1;
            continue;
        }

        item.state = report.state;
        if report.state.is_terminal() {
            item.completed_at = Some(now);
        }
        if report.state == ItemState::Failed {
            item.error_message = report.error.clone();
        }
        outcome.applied += 1;
    }

    outcome
}

/// Fail every non-terminal item with the cancellation message.
///
/// Returns how many items were affected.
pub fn apply_cancellation(items: &mut [ItemStatus], now: DateTime<Utc>) -> usize {
    let mut affected = 0;
    for item in items.iter_mut().filter(|item| !item.state.is_terminal()) {
        item.state = ItemState::Failed;
        item.completed_at = Some(now);
        item.error_message = Some(CANCELLED_ITEM_MESSAGE.to_string());
        affected += 1;
    }
    affected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(ids: &[&str]) -> Vec<ItemStatus> {
        ids.iter().map(|id| ItemStatus::submitted(*id)).collect()
    }

    #[test]
    fn applies_forward_transitions() {
        let mut items = local(&["a", "b", "c"]);
        let now = Utc::now();

        let outcome = apply_remote_states(
            &mut items,
            &[
                RemoteItemStatus::new("a", ItemState::InProgress),
                RemoteItemStatus::new("b", ItemState::Completed),
                RemoteItemStatus::failed("c", "origin unreachable"),
            ],
            now,
        );

        assert_eq!(outcome.applied, 3);
        assert_eq!(items[0].state, ItemState::InProgress);
        assert_eq!(items[0].completed_at, None);
        assert_eq!(items[1].completed_at, Some(now));
        assert_eq!(items[2].error_message.as_deref(), Some("origin unreachable"));
    }

    #[test]
    fn terminal_states_never_regress() {
        let mut items = local(&["a", "b"]);
        let first = Utc::now();
        apply_remote_states(
            &mut items,
            &[RemoteItemStatus::new("a", ItemState::Completed), RemoteItemStatus::failed("b", "x")],
            first,
        );

        for state in [ItemState::InProgress, ItemState::Submitted, ItemState::Failed] {
            let outcome = apply_remote_states(
                &mut items,
                &[RemoteItemStatus::new("a", state), RemoteItemStatus::new("b", ItemState::Completed)],
                Utc::now(),
            );
            assert_eq!(outcome.applied, 0);
            assert_eq!(outcome.ignored_regressions, 2);
        }

        assert_eq!(items[0].state, ItemState::Completed);
        assert_eq!(items[0].completed_at, Some(first));
        assert_eq!(items[1].state, ItemState::Failed);
    }

    #[test]
    fn in_progress_does_not_fall_back_to_submitted() {
        let mut items = local(&["a"]);
        apply_remote_states(&mut items, &[RemoteItemStatus::new("a", ItemState::InProgress)], Utc::now());

        let outcome =
            apply_remote_states(&mut items, &[RemoteItemStatus::new("a", ItemState::Submitted)], Utc::now());

        assert_eq!(outcome.ignored_regressions, 1);
        assert_eq!(items[0].state, ItemState::InProgress);
    }

    #[test]
    fn unknown_remote_items_are_reported() {
        let mut items = local(&["a"]);
        let outcome =
            apply_remote_states(&mut items, &[RemoteItemStatus::new("zzz", ItemState::Completed)], Utc::now());
        assert_eq!(outcome.unknown_items, vec!["zzz".to_string()]);
        assert_eq!(items[0].state, ItemState::Submitted);
    }

    #[test]
    fn cancellation_only_touches_pending_items() {
        let mut items = local(&["a", "b", "c"]);
        items[0].state = ItemState::Completed;
        items[1].state = ItemState::InProgress;

        let affected = apply_cancellation(&mut items, Utc::now());

        assert_eq!(affected, 2);
        assert_eq!(items[0].state, ItemState::Completed);
        assert_eq!(items[0].error_message, None);
        for item in &items[1..] {
            assert_eq!(item.state, ItemState::Failed);
            assert_eq!(item.error_message.as_deref(), Some(CANCELLED_ITEM_MESSAGE));
        }
    }
}
