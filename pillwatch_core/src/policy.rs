//! Notification policy for low-stock alerts.
//!
//! Decides whether an alert is due at one instant and owns the snooze
//! transition. Policy evaluation never mutates stored state; callers apply
//! the [`MedicineUpdate`] a transition produces.

use crate::{MedicineRecord, MedicineUpdate, StockLevel, StockStatus};
use chrono::{DateTime, Duration, Utc};

/// Whether an unexpired snooze is suppressing alerts for this record
pub fn is_snoozed(record: &MedicineRecord, now: DateTime<Utc>) -> bool {
    matches!(record.snoozed_until, Some(until) if until > now)
}

/// Whether a low-stock alert should fire now
///
/// Fires iff `days_left` is at or below the threshold AND no snooze is
/// active. Stateless per call; snooze duration is decided by the separate
/// [`snooze`] transition.
pub fn should_alert(
    record: &MedicineRecord,
    level: StockLevel,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> bool {
    level.days_left <= threshold_days && !is_snoozed(record, now)
}

/// Classify a record against the alert state machine
pub fn status(
    record: &MedicineRecord,
    level: StockLevel,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> StockStatus {
    if level.days_left > threshold_days {
        StockStatus::Ok
    } else if is_snoozed(record, now) {
        StockStatus::LowSuppressed
    } else {
        StockStatus::LowEligible
    }
}

/// The snooze transition: suppress alerts until `now + duration`
///
/// Idempotent for callers: re-applying simply re-extends the suppression
/// window from the current instant. Applied by the sweep as a post-delivery
/// cooldown and by the user-facing snooze action.
pub fn snooze(now: DateTime<Utc>, duration: Duration) -> MedicineUpdate {
    MedicineUpdate {
        snoozed_until: Some(Some(now + duration)),
        ..Default::default()
    }
}
