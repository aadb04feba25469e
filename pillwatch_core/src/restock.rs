//! Restock transition: the only upward path for stock.
//!
//! A restock replaces the baseline quantity, moves the depletion clock to
//! `now`, and clears any active snooze so a still-low record alerts again
//! on its own merits.

use crate::{Error, MedicineUpdate, Result};
use chrono::{DateTime, Utc};

/// Build the update a restock applies to a record
///
/// Rejects non-positive quantities with `InvalidInput`; the record is
/// untouched on rejection.
pub fn restock(new_quantity: i64, now: DateTime<Utc>) -> Result<MedicineUpdate> {
    if new_quantity < 1 {
        return Err(Error::InvalidInput(format!(
            "restock quantity must be >= 1, got {}",
            new_quantity
        )));
    }

    Ok(MedicineUpdate {
        total_quantity: Some(new_quantity),
        last_restocked_at: Some(now),
        snoozed_until: Some(None),
    })
}
