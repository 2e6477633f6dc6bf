//! Box accounting for a single batch.
//!
//! `BoxLedger` is the in-memory form of a batch's counters and status. It is
//! built once from a stored row (legacy NULL counters are normalized there and
//! nowhere else), mutated by the harvest, dispatch and status-request rules,
//! and written back with [`BoxLedger::apply_to`]. Every mutation re-checks
//! `0 <= harvested <= allocated` and `0 <= dispatched <= harvested` before
//! anything reaches the database.

use chrono::NaiveDate;
use sea_orm::ActiveValue::Set;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::batch::{self, BatchStatus};
use crate::errors::ServiceError;

pub const HARVEST_CAPACITY_EXCEEDED: &str = "HARVEST_CAPACITY_EXCEEDED";
pub const DISPATCH_CAPACITY_EXCEEDED: &str = "DISPATCH_CAPACITY_EXCEEDED";
pub const INVALID_COUNT: &str = "INVALID_BOX_COUNT";
pub const LEDGER_INVARIANT_VIOLATED: &str = "LEDGER_INVARIANT_VIOLATED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxLedger {
    pub batch_id: Uuid,
    /// Version the ledger was loaded at; writes are conditional on it.
    pub version: i32,
    pub status: BatchStatus,
    pub estimated: i32,
    pub allocated: i32,
    pub harvested: i32,
    pub dispatched: i32,
    pub start_date: Option<NaiveDate>,
}

/// Outcome of a status request, used for logging and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: BatchStatus,
    pub to: BatchStatus,
}

impl StatusChange {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

impl BoxLedger {
    /// Builds a ledger from a stored batch, restoring missing counters:
    /// allocated falls back to the estimate, harvested to the older
    /// `actual_boxes` column and then zero, dispatched to zero.
    /// Remaining and gate-pass-remaining are always derived, never read.
    pub fn from_model(model: &batch::Model) -> Self {
        Self {
            batch_id: model.id,
            version: model.version,
            status: model.status,
            estimated: model.estimated_boxes,
            allocated: model.allocated_boxes.unwrap_or(model.estimated_boxes),
            harvested: model.harvested_boxes.or(model.actual_boxes).unwrap_or(0),
            dispatched: model.dispatched_boxes.unwrap_or(0),
            start_date: model.start_date,
        }
    }

    /// Ledger for a batch that has just been created from an inspection.
    pub fn opening(batch_id: Uuid, estimated: i32, today: NaiveDate) -> Self {
        Self {
            batch_id,
            version: 0,
            status: BatchStatus::Created,
            estimated,
            allocated: estimated,
            harvested: 0,
            dispatched: 0,
            start_date: Some(today),
        }
    }

    /// Harvest capacity left.
    pub fn remaining(&self) -> i32 {
        self.allocated - self.harvested
    }

    /// Dispatch capacity left.
    pub fn gate_pass_remaining(&self) -> i32 {
        self.harvested - self.dispatched
    }

    /// Boxes used for per-box costing: harvested if any, else the estimate.
    pub fn box_count(&self) -> i32 {
        if self.harvested > 0 {
            self.harvested
        } else {
            self.estimated
        }
    }

    pub fn check_invariants(&self) -> Result<(), ServiceError> {
        let ok = self.harvested >= 0
            && self.harvested <= self.allocated
            && self.dispatched >= 0
            && self.dispatched <= self.harvested;
        if ok {
            Ok(())
        } else {
            Err(ServiceError::business(
                LEDGER_INVARIANT_VIOLATED,
                format!(
                    "Batch {} box counts are inconsistent: allocated={}, harvested={}, dispatched={}",
                    self.batch_id, self.allocated, self.harvested, self.dispatched
                ),
            ))
        }
    }

    /// Applies a harvest report of `boxes_packed` boxes.
    ///
    /// `CREATED` moves to `IN_PROGRESS` first; then a partially harvested
    /// batch is `HARVEST_IN_PROGRESS` and a fully harvested one
    /// `HARVEST_COMPLETED`.
    pub fn record_harvest(&mut self, boxes_packed: i32, today: NaiveDate) -> Result<(), ServiceError> {
        if boxes_packed < 0 {
            return Err(ServiceError::business(
                INVALID_COUNT,
                "Boxes packed cannot be negative",
            ));
        }
        let remaining = self.remaining();
        if boxes_packed > remaining {
            return Err(ServiceError::CapacityExceeded {
                code: HARVEST_CAPACITY_EXCEEDED,
                message: format!(
                    "Limit exceeded. Only {} boxes remaining for harvest in this batch.",
                    remaining
                ),
                remaining,
                requested: boxes_packed,
            });
        }

        self.harvested += boxes_packed;

        if self.status == BatchStatus::Created {
            self.status = BatchStatus::InProgress;
        }
        if self.harvested > 0 && self.harvested < self.allocated {
            self.enter(BatchStatus::HarvestInProgress, today);
        } else if self.harvested >= self.allocated {
            self.enter(BatchStatus::HarvestCompleted, today);
        }

        self.check_invariants()
    }

    /// Replaces the harvested count with the authoritative sum of packed
    /// boxes across all reports.
    pub fn reconcile_harvested(&mut self, packed_total: i32) -> Result<(), ServiceError> {
        if packed_total != self.harvested {
            warn!(
                batch_id = %self.batch_id,
                ledger = self.harvested,
                reports = packed_total,
                "Harvested counter disagreed with report total; using report total"
            );
        }
        self.harvested = packed_total;
        self.check_invariants()
    }

    /// Applies a gate pass of `total_boxes` boxes.
    pub fn record_dispatch(&mut self, total_boxes: i32) -> Result<(), ServiceError> {
        if total_boxes <= 0 {
            return Err(ServiceError::business(
                INVALID_COUNT,
                "A gate pass must carry at least one box",
            ));
        }
        let available = self.gate_pass_remaining();
        if total_boxes > available {
            return Err(ServiceError::CapacityExceeded {
                code: DISPATCH_CAPACITY_EXCEEDED,
                message: format!(
                    "Limit exceeded. Only {} boxes available for dispatch in this batch.",
                    available
                ),
                remaining: available,
                requested: total_boxes,
            });
        }

        self.dispatched += total_boxes;

        if self.dispatched > 0 && self.dispatched < self.harvested {
            self.status = BatchStatus::DispatchInProgress;
        } else if self.dispatched >= self.harvested {
            if self.harvested >= self.allocated {
                self.status = BatchStatus::DispatchCompleted;
            } else {
                // dispatch caught up with a harvest that is still running
                self.status = BatchStatus::HarvestInProgress;
            }
        }

        self.check_invariants()
    }

    /// Applies an explicit status request.
    ///
    /// `IN_TRANSIT` requires `DISPATCH_COMPLETED`; `DELIVERED` requires
    /// `IN_TRANSIT` or `DISPATCH_COMPLETED`. Every other target is accepted.
    pub fn request_status(
        &mut self,
        target: BatchStatus,
        today: NaiveDate,
    ) -> Result<StatusChange, ServiceError> {
        let from = self.status;
        match target {
            BatchStatus::InTransit if from != BatchStatus::DispatchCompleted => {
                return Err(ServiceError::InvalidTransition {
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }
            BatchStatus::Delivered
                if !matches!(from, BatchStatus::InTransit | BatchStatus::DispatchCompleted) =>
            {
                return Err(ServiceError::InvalidTransition {
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }
            BatchStatus::HarvestCompleted
                if !matches!(
                    from,
                    BatchStatus::HarvestInProgress
                        | BatchStatus::Created
                        | BatchStatus::InProgress
                        | BatchStatus::DispatchInProgress
                ) =>
            {
                // accepted, but worth seeing in the logs
                warn!(
                    batch_id = %self.batch_id,
                    from = %from,
                    "HARVEST_COMPLETED requested from an unusual status"
                );
            }
            _ => {}
        }

        self.enter(target, today);
        debug!(batch_id = %self.batch_id, from = %from, to = %target, "Batch status set");
        Ok(StatusChange { from, to: target })
    }

    fn enter(&mut self, status: BatchStatus, today: NaiveDate) {
        if status == BatchStatus::HarvestInProgress && self.start_date.is_none() {
            self.start_date = Some(today);
        }
        self.status = status;
    }

    /// Copies counters, status and dates onto `model` and bumps its version.
    /// The caller's write must be conditional on [`BoxLedger::version`].
    pub fn apply_to(&self, model: &mut batch::ActiveModel, now: chrono::DateTime<chrono::Utc>) {
        model.status = Set(self.status);
        model.allocated_boxes = Set(Some(self.allocated));
        model.harvested_boxes = Set(Some(self.harvested));
        model.remaining_boxes = Set(Some(self.remaining()));
        model.actual_boxes = Set(Some(self.harvested));
        model.dispatched_boxes = Set(Some(self.dispatched));
        model.gate_pass_remaining = Set(Some(self.gate_pass_remaining()));
        model.start_date = Set(self.start_date);
        model.version = Set(self.version + 1);
        model.updated_at = Set(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rstest::rstest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn ledger(allocated: i32) -> BoxLedger {
        BoxLedger::opening(Uuid::new_v4(), allocated, today())
    }

    fn stored(status: BatchStatus) -> batch::Model {
        let now = Utc::now();
        batch::Model {
            id: Uuid::new_v4(),
            batch_code: "BATCH-20240301-0001".into(),
            inspection_id: None,
            farm_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            status,
            estimated_boxes: 80,
            allocated_boxes: None,
            harvested_boxes: Some(30),
            remaining_boxes: None,
            actual_boxes: None,
            dispatched_boxes: None,
            gate_pass_remaining: None,
            start_date: None,
            end_date: None,
            notes: None,
            version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn legacy_nulls_are_normalized_on_load() {
        let l = BoxLedger::from_model(&stored(BatchStatus::HarvestInProgress));
        assert_eq!(l.allocated, 80);
        assert_eq!(l.harvested, 30);
        assert_eq!(l.dispatched, 0);
        assert_eq!(l.remaining(), 50);
        assert_eq!(l.gate_pass_remaining(), 30);
        assert_eq!(l.version, 4);
    }

    #[test]
    fn rows_without_harvested_count_fall_back_to_actual_boxes() {
        let mut row = stored(BatchStatus::HarvestCompleted);
        row.allocated_boxes = Some(50);
        row.harvested_boxes = None;
        row.actual_boxes = Some(50);

        let mut l = BoxLedger::from_model(&row);
        assert_eq!(l.harvested, 50);
        assert_eq!(l.gate_pass_remaining(), 50);
        assert_eq!(l.box_count(), 50);

        l.record_dispatch(50).unwrap();
        assert_eq!(l.status, BatchStatus::DispatchCompleted);
    }

    #[test]
    fn full_lifecycle_of_a_hundred_box_batch() {
        let mut l = ledger(100);

        l.record_harvest(60, today()).unwrap();
        assert_eq!((l.harvested, l.remaining()), (60, 40));
        assert_eq!(l.status, BatchStatus::HarvestInProgress);

        l.record_harvest(40, today()).unwrap();
        assert_eq!((l.harvested, l.remaining()), (100, 0));
        assert_eq!(l.status, BatchStatus::HarvestCompleted);

        l.record_dispatch(100).unwrap();
        assert_eq!((l.dispatched, l.gate_pass_remaining()), (100, 0));
        assert_eq!(l.status, BatchStatus::DispatchCompleted);
    }

    #[test]
    fn over_harvest_names_remaining_and_leaves_ledger_untouched() {
        let mut l = ledger(100);
        l.record_harvest(60, today()).unwrap();
        let before = l.clone();

        let err = l.record_harvest(41, today()).unwrap_err();
        assert!(err.to_string().contains("Only 40 boxes remaining"));
        assert_matches!(
            err,
            ServiceError::CapacityExceeded { remaining: 40, requested: 41, .. }
        );
        assert_eq!(l, before);
    }

    #[test]
    fn zero_box_report_moves_created_to_in_progress() {
        let mut l = ledger(100);
        l.record_harvest(0, today()).unwrap();
        assert_eq!(l.status, BatchStatus::InProgress);
    }

    #[test]
    fn first_harvest_stamps_missing_start_date_only() {
        let mut l = ledger(10);
        l.start_date = None;
        l.record_harvest(5, today()).unwrap();
        assert_eq!(l.start_date, Some(today()));

        let later = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        l.request_status(BatchStatus::HarvestInProgress, later).unwrap();
        assert_eq!(l.start_date, Some(today()));
    }

    #[test]
    fn over_dispatch_names_available_boxes() {
        let mut l = ledger(100);
        l.record_harvest(30, today()).unwrap();
        let err = l.record_dispatch(31).unwrap_err();
        assert_matches!(
            err,
            ServiceError::CapacityExceeded { remaining: 30, requested: 31, .. }
        );
        assert_eq!(l.dispatched, 0);
    }

    #[test]
    fn partial_dispatch_then_catch_up_during_harvest() {
        let mut l = ledger(100);
        l.record_harvest(50, today()).unwrap();

        l.record_dispatch(20).unwrap();
        assert_eq!(l.status, BatchStatus::DispatchInProgress);

        l.record_dispatch(30).unwrap();
        assert_eq!(l.status, BatchStatus::HarvestInProgress);
        assert_eq!(l.gate_pass_remaining(), 0);
    }

    #[test]
    fn in_transit_requires_dispatch_completed() {
        let mut l = ledger(10);
        l.record_harvest(10, today()).unwrap();
        let before = l.clone();

        let err = l.request_status(BatchStatus::InTransit, today()).unwrap_err();
        assert_matches!(err, ServiceError::InvalidTransition { .. });
        assert_eq!(l, before);

        l.record_dispatch(10).unwrap();
        let change = l.request_status(BatchStatus::InTransit, today()).unwrap();
        assert_eq!(change.from, BatchStatus::DispatchCompleted);
        assert_eq!(l.status, BatchStatus::InTransit);
    }

    #[rstest]
    #[case(BatchStatus::Created, BatchStatus::Delivered, false)]
    #[case(BatchStatus::HarvestCompleted, BatchStatus::Delivered, false)]
    #[case(BatchStatus::DispatchCompleted, BatchStatus::Delivered, true)]
    #[case(BatchStatus::InTransit, BatchStatus::Delivered, true)]
    #[case(BatchStatus::DispatchInProgress, BatchStatus::InTransit, false)]
    #[case(BatchStatus::Created, BatchStatus::Cancelled, true)]
    #[case(BatchStatus::Delivered, BatchStatus::Completed, true)]
    #[case(BatchStatus::Cancelled, BatchStatus::InProgress, true)]
    fn status_requests(#[case] from: BatchStatus, #[case] to: BatchStatus, #[case] allowed: bool) {
        let mut l = ledger(10);
        l.status = from;
        let result = l.request_status(to, today());
        assert_eq!(result.is_ok(), allowed, "{} -> {}", from, to);
        assert_eq!(l.status, if allowed { to } else { from });
    }

    #[test]
    fn harvest_completed_is_accepted_from_any_status() {
        for from in [BatchStatus::Created, BatchStatus::Delivered, BatchStatus::Cancelled] {
            let mut l = ledger(10);
            l.status = from;
            let change = l.request_status(BatchStatus::HarvestCompleted, today()).unwrap();
            assert_eq!(change.from, from);
            assert_eq!(l.status, BatchStatus::HarvestCompleted);
        }
    }

    #[test]
    fn reconcile_rejects_sum_beyond_allocation() {
        let mut l = ledger(10);
        l.record_harvest(10, today()).unwrap();
        assert!(l.reconcile_harvested(10).is_ok());
        assert_matches!(
            l.reconcile_harvested(12),
            Err(ServiceError::BusinessRule { code: LEDGER_INVARIANT_VIOLATED, .. })
        );
    }

    #[test]
    fn box_count_falls_back_to_estimate() {
        let mut l = ledger(100);
        assert_eq!(l.box_count(), 100);
        l.record_harvest(60, today()).unwrap();
        assert_eq!(l.box_count(), 60);
    }

    #[test]
    fn apply_to_writes_derived_counters_and_bumps_version() {
        let mut l = BoxLedger::from_model(&stored(BatchStatus::HarvestInProgress));
        l.record_harvest(50, today()).unwrap();

        let mut am: batch::ActiveModel = Default::default();
        l.apply_to(&mut am, Utc::now());
        assert_eq!(am.harvested_boxes, Set(Some(80)));
        assert_eq!(am.remaining_boxes, Set(Some(0)));
        assert_eq!(am.actual_boxes, Set(Some(80)));
        assert_eq!(am.gate_pass_remaining, Set(Some(80)));
        assert_eq!(am.status, Set(BatchStatus::HarvestCompleted));
        assert_eq!(am.version, Set(5));
    }
}
