//! Time-based stock depletion model.
//!
//! Remaining stock is never stored; it is derived on every read from the
//! record's baseline quantity, its constant daily dosage, and the elapsed
//! whole days since the baseline date.

use crate::{MedicineRecord, StockLevel};
use chrono::{DateTime, Utc};

/// The most recent instant depletion is measured from (creation or restock)
pub fn baseline_date(record: &MedicineRecord) -> DateTime<Utc> {
    record.start_date.max(record.last_restocked_at)
}

/// Derive remaining stock and days of supply at the given instant
///
/// ## Depletion model
///
/// - `days_passed = floor(now - baseline)`, clamped at zero so a baseline
///   in the future never produces negative elapsed time
/// - `consumed = days_passed * dosage_per_day`
/// - `current_stock = total_quantity - consumed`, clamped at zero
/// - `days_left = floor(current_stock / dosage_per_day)`, zero once the
///   stock is exhausted
///
/// Whole-day truncation, never rounding: stock drops in dosage-sized steps
/// exactly once per elapsed day. Pure function of its inputs; `now` is
/// always injected by the caller.
pub fn evaluate(record: &MedicineRecord, now: DateTime<Utc>) -> StockLevel {
    let days_passed = (now - baseline_date(record)).num_days().max(0);
    let consumed = days_passed.saturating_mul(record.dosage_per_day);
    let current_stock = (record.total_quantity - consumed).max(0);
    let days_left = if current_stock > 0 {
        current_stock / record.dosage_per_day
    } else {
        0
    };

    StockLevel {
        current_stock,
        days_left,
    }
}
