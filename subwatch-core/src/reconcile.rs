//! Client-side reconciliation of target state
//!
//! A presentation layer keeps one [`TargetBoard`]. Intents are applied
//! optimistically through [`TargetBoard::begin`], which returns a
//! [`Checkpoint`]. The caller then either confirms with what the store
//! returned or rolls back. Each entry keeps the last store-confirmed record
//! next to the displayed one: confirmations always land on that base, even
//! when a newer intent is still pending, and a rollback restores it. A full
//! listing always wins over local state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::types::{DispatchReceipt, ScanStatus, ScheduleState, Target};
use crate::utils::datetime::plus_minutes;

/// A user action awaiting confirmation
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    Dispatch,
    EnableSchedule { waiting_minutes: u32 },
    DisableSchedule,
}

/// Handle for one optimistic transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub target_id: i64,
    pub seq: u64,
}

/// Derived, read-only view of one target
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TargetView {
    pub target_id: i64,
    pub name: String,
    pub scan_status: ScanStatus,
    /// A manual scan may be requested right now
    pub can_dispatch: bool,
    pub is_scheduled: bool,
    pub schedule_label: String,
    pub next_run_time: Option<DateTime<Utc>>,
    /// Intent still waiting for the store
    pub pending: Option<Intent>,
}

#[derive(Debug, Clone)]
struct Entry {
    /// What the view shows, optimistic guesses included
    target: Target,
    /// Last state the store confirmed
    confirmed: Target,
    /// Checkpoints at or below this are already reflected in `confirmed`
    base_seq: u64,
    pending: Option<(u64, Intent)>,
}

impl Entry {
    fn confirmed(target: Target, base_seq: u64) -> Self {
        Self {
            confirmed: target.clone(),
            target,
            base_seq,
            pending: None,
        }
    }
}

/// Authoritative local record per target
#[derive(Debug, Default)]
pub struct TargetBoard {
    entries: BTreeMap<i64, Entry>,
    seq: u64,
}

impl TargetBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite local state with a full listing
    ///
    /// Targets missing from the snapshot are dropped; pending intents are
    /// discarded.
    pub fn replace_snapshot(&mut self, targets: Vec<Target>) {
        let seq = self.seq;
        self.entries = targets
            .into_iter()
            .map(|target| (target.id, Entry::confirmed(target, seq)))
            .collect();
    }

    /// Apply an intent optimistically
    ///
    /// A dispatch against a target that already has an outstanding scan is
    /// refused locally with the same conflict the store would return.
    pub fn begin(
        &mut self,
        target_id: i64,
        intent: Intent,
        now: DateTime<Utc>,
    ) -> CoreResult<Checkpoint> {
        let entry = self
            .entries
            .get_mut(&target_id)
            .ok_or(CoreError::TargetNotFound(target_id))?;

        if intent == Intent::Dispatch && entry.target.scan_status.is_outstanding() {
            return Err(CoreError::ScanInProgress {
                target_id,
                status: entry.target.scan_status,
            });
        }

        self.seq += 1;
        let checkpoint = Checkpoint {
            target_id,
            seq: self.seq,
        };

        let target = &mut entry.target;
        match intent {
            Intent::Dispatch => target.scan_status = ScanStatus::Queued,
            Intent::EnableSchedule { waiting_minutes } => {
                target.is_scheduled = true;
                target.waiting_minutes = waiting_minutes;
                target.next_run_time = Some(plus_minutes(now, waiting_minutes));
            }
            Intent::DisableSchedule => {
                target.is_scheduled = false;
                target.next_run_time = None;
            }
        }
        entry.pending = Some((self.seq, intent));

        Ok(checkpoint)
    }

    /// Apply a confirmed dispatch
    ///
    /// Returns whether the displayed target changed.
    pub fn confirm_dispatch(&mut self, checkpoint: &Checkpoint, receipt: &DispatchReceipt) -> bool {
        self.settle(checkpoint, |target| target.scan_status = receipt.status)
    }

    /// Apply a confirmed schedule change
    pub fn confirm_schedule(&mut self, checkpoint: &Checkpoint, state: &ScheduleState) -> bool {
        self.settle(checkpoint, |target| {
            target.is_scheduled = state.is_scheduled;
            target.waiting_minutes = state.waiting_minutes;
            target.next_run_time = state.next_run_time;
        })
    }

    /// Store a target record read from the store
    ///
    /// Replaces the local record and any pending intent.
    pub fn confirm_target(&mut self, target: Target) {
        self.entries
            .insert(target.id, Entry::confirmed(target, self.seq));
    }

    /// Drop the optimistic state of `checkpoint` and show the confirmed base
    ///
    /// Ignored when a newer intent or a snapshot has replaced it. Returns
    /// whether anything changed.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> bool {
        let Some(entry) = self
            .entries
            .get_mut(&checkpoint.target_id)
            .filter(|e| matches!(e.pending, Some((seq, _)) if seq == checkpoint.seq))
        else {
            log::debug!(
                "Ignoring stale rollback #{} for target {}",
                checkpoint.seq,
                checkpoint.target_id
            );
            return false;
        };
        entry.target = entry.confirmed.clone();
        entry.pending = None;
        true
    }

    /// Forget a deleted target
    pub fn remove(&mut self, target_id: i64) -> Option<Target> {
        self.entries.remove(&target_id).map(|e| e.target)
    }

    #[must_use]
    pub fn get(&self, target_id: i64) -> Option<&Target> {
        self.entries.get(&target_id).map(|e| &e.target)
    }

    #[must_use]
    pub fn view(&self, target_id: i64) -> Option<TargetView> {
        self.entries.get(&target_id).map(view_of)
    }

    /// Views of every target, ordered by ID
    #[must_use]
    pub fn views(&self) -> Vec<TargetView> {
        self.entries.values().map(view_of).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn settle(&mut self, checkpoint: &Checkpoint, apply: impl Fn(&mut Target)) -> bool {
        let Some(entry) = self
            .entries
            .get_mut(&checkpoint.target_id)
            .filter(|e| checkpoint.seq > e.base_seq)
        else {
            log::debug!(
                "Ignoring superseded confirmation #{} for target {}",
                checkpoint.seq,
                checkpoint.target_id
            );
            return false;
        };

        apply(&mut entry.confirmed);
        entry.base_seq = checkpoint.seq;
        match entry.pending {
            Some((seq, _)) if seq == checkpoint.seq => {
                apply(&mut entry.target);
                entry.pending = None;
                true
            }
            None => {
                entry.target = entry.confirmed.clone();
                true
            }
            // A newer intent keeps its optimistic view until it settles
            Some(_) => false,
        }
    }
}

fn view_of(entry: &Entry) -> TargetView {
    let target = &entry.target;
    TargetView {
        target_id: target.id,
        name: target.name.clone(),
        scan_status: target.scan_status,
        can_dispatch: !target.scan_status.is_outstanding()
            && !matches!(entry.pending, Some((_, Intent::Dispatch))),
        is_scheduled: target.is_scheduled,
        schedule_label: schedule_label(target),
        next_run_time: target.next_run_time,
        pending: entry.pending.map(|(_, intent)| intent),
    }
}

fn schedule_label(target: &Target) -> String {
    if !target.is_scheduled {
        return "not scheduled".to_string();
    }
    let m = target.waiting_minutes;
    if m % 1440 == 0 {
        format!("every {} d", m / 1440)
    } else if m % 60 == 0 {
        format!("every {} h", m / 60)
    } else {
        format!("every {m} min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn target(id: i64, name: &str) -> Target {
        let now = Utc::now();
        Target {
            id,
            name: name.to_string(),
            url: None,
            scan_status: ScanStatus::Idle,
            is_scheduled: false,
            waiting_minutes: 60,
            next_run_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn board() -> TargetBoard {
        let mut board = TargetBoard::new();
        board.replace_snapshot(vec![target(1, "acme"), target(2, "globex")]);
        board
    }

    #[test]
    fn dispatch_is_optimistic_then_confirmed() {
        let mut board = board();
        let cp = board.begin(1, Intent::Dispatch, Utc::now()).unwrap();

        let view = board.view(1).unwrap();
        assert_eq!(view.scan_status, ScanStatus::Queued);
        assert!(!view.can_dispatch);
        assert_eq!(view.pending, Some(Intent::Dispatch));

        let receipt = DispatchReceipt {
            accepted: true,
            status: ScanStatus::Queued,
            scan_run_id: 10,
        };
        assert!(board.confirm_dispatch(&cp, &receipt));
        assert_eq!(board.view(1).unwrap().pending, None);
    }

    #[test]
    fn second_dispatch_is_refused_locally() {
        let mut board = board();
        board.begin(1, Intent::Dispatch, Utc::now()).unwrap();
        let err = board.begin(1, Intent::Dispatch, Utc::now()).unwrap_err();
        assert!(err.is_conflict());
        // Other targets are unaffected
        assert!(board.begin(2, Intent::Dispatch, Utc::now()).is_ok());
    }

    #[test]
    fn rollback_restores_last_known_good() {
        let mut board = board();
        let cp = board
            .begin(1, Intent::EnableSchedule { waiting_minutes: 5 }, Utc::now())
            .unwrap();
        assert!(board.get(1).unwrap().is_scheduled);

        assert!(board.rollback(cp));
        let restored = board.get(1).unwrap();
        assert!(!restored.is_scheduled);
        assert_eq!(restored.next_run_time, None);
        assert_eq!(restored.waiting_minutes, 60);
    }

    #[test]
    fn confirmation_applies_store_values() {
        let mut board = board();
        let now = Utc::now();
        let cp = board
            .begin(1, Intent::EnableSchedule { waiting_minutes: 5 }, now)
            .unwrap();

        let confirmed = now + Duration::minutes(5) + Duration::seconds(1);
        board.confirm_schedule(
            &cp,
            &ScheduleState {
                target_id: 1,
                is_scheduled: true,
                waiting_minutes: 5,
                next_run_time: Some(confirmed),
            },
        );
        let view = board.view(1).unwrap();
        assert_eq!(view.next_run_time, Some(confirmed));
        assert_eq!(view.schedule_label, "every 5 min");
    }

    #[test]
    fn stale_checkpoints_are_ignored() {
        let mut board = board();
        let first = board
            .begin(1, Intent::EnableSchedule { waiting_minutes: 5 }, Utc::now())
            .unwrap();
        let _second = board.begin(1, Intent::DisableSchedule, Utc::now()).unwrap();

        assert!(!board.rollback(first));
        assert!(!board.get(1).unwrap().is_scheduled);
        assert_eq!(board.view(1).unwrap().pending, Some(Intent::DisableSchedule));
    }

    #[test]
    fn stale_confirmation_survives_newer_rollback() {
        let mut board = board();
        let now = Utc::now();
        let enable = board
            .begin(1, Intent::EnableSchedule { waiting_minutes: 5 }, now)
            .unwrap();
        let disable = board.begin(1, Intent::DisableSchedule, now).unwrap();

        let stored = now + Duration::minutes(5) + Duration::seconds(3);
        let changed = board.confirm_schedule(
            &enable,
            &ScheduleState {
                target_id: 1,
                is_scheduled: true,
                waiting_minutes: 5,
                next_run_time: Some(stored),
            },
        );
        assert!(!changed);
        // The newer intent still shows its own guess
        assert!(!board.get(1).unwrap().is_scheduled);

        assert!(board.rollback(disable));
        let restored = board.get(1).unwrap();
        assert!(restored.is_scheduled);
        assert_eq!(restored.waiting_minutes, 5);
        assert_eq!(restored.next_run_time, Some(stored));
        assert_eq!(board.view(1).unwrap().pending, None);
    }

    #[test]
    fn confirmation_after_snapshot_is_ignored() {
        let mut board = board();
        let cp = board.begin(1, Intent::Dispatch, Utc::now()).unwrap();
        board.replace_snapshot(vec![target(1, "acme")]);

        let receipt = DispatchReceipt {
            accepted: true,
            status: ScanStatus::Queued,
            scan_run_id: 10,
        };
        assert!(!board.confirm_dispatch(&cp, &receipt));
        assert_eq!(board.get(1).unwrap().scan_status, ScanStatus::Idle);
    }

    #[test]
    fn snapshot_wins_over_pending_state() {
        let mut board = board();
        let cp = board.begin(1, Intent::Dispatch, Utc::now()).unwrap();

        let mut running = target(1, "acme");
        running.scan_status = ScanStatus::Running;
        board.replace_snapshot(vec![running]);

        assert_eq!(board.len(), 1);
        assert!(board.get(2).is_none());
        assert_eq!(board.get(1).unwrap().scan_status, ScanStatus::Running);
        assert!(!board.rollback(cp));
        assert_eq!(board.get(1).unwrap().scan_status, ScanStatus::Running);
    }

    #[test]
    fn unknown_target_is_not_found() {
        let mut board = board();
        assert!(matches!(
            board.begin(9, Intent::Dispatch, Utc::now()).unwrap_err(),
            CoreError::TargetNotFound(9)
        ));
    }

    #[test]
    fn schedule_labels() {
        let mut t = target(1, "acme");
        assert_eq!(schedule_label(&t), "not scheduled");
        t.is_scheduled = true;
        t.waiting_minutes = 120;
        assert_eq!(schedule_label(&t), "every 2 h");
        t.waiting_minutes = 2880;
        assert_eq!(schedule_label(&t), "every 2 d");
    }

    #[test]
    fn confirm_target_and_remove() {
        let mut board = board();
        let mut renamed = target(2, "globex-prod");
        renamed.scan_status = ScanStatus::Queued;
        board.confirm_target(renamed);
        assert_eq!(board.view(2).unwrap().name, "globex-prod");
        assert!(!board.view(2).unwrap().can_dispatch);

        assert!(board.remove(2).is_some());
        assert_eq!(board.views().len(), 1);
    }
}
