//! Core domain types for the Pillwatch system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medicine records and their validated creation inputs
//! - Partial update requests consumed by the store
//! - Derived stock levels and per-record alert status
//! - Alert messages and sweep reports

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Medicine Record Types
// ============================================================================

/// A tracked medicine with its depletion baseline and suppression state
///
/// `total_quantity` is the pill count as of the last baseline-setting event
/// (creation or restock), not the live count; the live count is derived by
/// [`crate::stock::evaluate`] from elapsed time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicineRecord {
    pub id: Uuid,
    pub name: String,
    pub total_quantity: i64,
    pub dosage_per_day: i64,
    /// Creation time; immutable once set
    pub start_date: DateTime<Utc>,
    /// Initialized to `start_date`, moved forward on every restock
    pub last_restocked_at: DateTime<Utc>,
    /// Suppress alerts until this instant; `None` means not snoozed
    #[serde(default)]
    pub snoozed_until: Option<DateTime<Utc>>,
}

/// Validated input for registering a new medicine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub total_quantity: i64,
    pub dosage_per_day: i64,
}

impl NewMedicine {
    /// Check field invariants before a record is created
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("medicine name must not be empty".into()));
        }
        if self.total_quantity < 0 {
            return Err(Error::InvalidInput(format!(
                "quantity must be >= 0, got {}",
                self.total_quantity
            )));
        }
        if self.dosage_per_day < 1 {
            return Err(Error::InvalidInput(format!(
                "dosage per day must be >= 1, got {}",
                self.dosage_per_day
            )));
        }
        Ok(())
    }
}

/// Partial-field update request consumed by [`crate::store::Store::update`]
///
/// `snoozed_until` is doubly optional: the outer `None` leaves the field
/// unchanged, `Some(None)` clears an active snooze.
#[derive(Clone, Debug, Default)]
pub struct MedicineUpdate {
    pub total_quantity: Option<i64>,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub snoozed_until: Option<Option<DateTime<Utc>>>,
}

impl MedicineUpdate {
    /// Apply the requested fields to a record in place
    pub fn apply(&self, record: &mut MedicineRecord) {
        if let Some(quantity) = self.total_quantity {
            record.total_quantity = quantity;
        }
        if let Some(restocked_at) = self.last_restocked_at {
            record.last_restocked_at = restocked_at;
        }
        if let Some(snoozed_until) = self.snoozed_until {
            record.snoozed_until = snoozed_until;
        }
    }
}

// ============================================================================
// Derived Stock Types
// ============================================================================

/// Remaining stock derived from elapsed time, never persisted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockLevel {
    pub current_stock: i64,
    pub days_left: i64,
}

/// Per-record alert status at one evaluation instant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockStatus {
    /// Supply above the low-stock threshold
    Ok,
    /// Supply low and no active snooze; an alert is due
    LowEligible,
    /// Supply low but suppressed by an unexpired snooze
    LowSuppressed,
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StockStatus::Ok => "ok",
            StockStatus::LowEligible => "low",
            StockStatus::LowSuppressed => "low (snoozed)",
        };
        // pad() so width specifiers in list output apply
        f.pad(label)
    }
}

// ============================================================================
// Alert and Sweep Types
// ============================================================================

/// A composed low-stock alert handed to the notifier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub current_stock: i64,
    pub days_left: i64,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub queued_at: DateTime<Utc>,
}

/// Summary of one sweep tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records evaluated this tick
    pub evaluated: usize,
    /// Alerts dispatched to the notifier
    pub alerts_sent: usize,
    /// Records whose delivery failed and was deferred to the next tick
    pub delivery_failures: usize,
    /// Low records suppressed by an active snooze
    pub suppressed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn valid_medicine() -> NewMedicine {
        NewMedicine {
            name: "Lisinopril".into(),
            total_quantity: 30,
            dosage_per_day: 1,
        }
    }

    #[test]
    fn test_new_medicine_valid() {
        assert!(valid_medicine().validate().is_ok());
    }

    #[test]
    fn test_new_medicine_empty_name_rejected() {
        let mut new = valid_medicine();
        new.name = "   ".into();
        assert!(matches!(new.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_new_medicine_negative_quantity_rejected() {
        let mut new = valid_medicine();
        new.total_quantity = -1;
        assert!(matches!(new.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_new_medicine_zero_dosage_rejected() {
        let mut new = valid_medicine();
        new.dosage_per_day = 0;
        assert!(matches!(new.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_update_applies_only_requested_fields() {
        let now = Utc::now();
        let mut record = MedicineRecord {
            id: Uuid::new_v4(),
            name: "Metformin".into(),
            total_quantity: 60,
            dosage_per_day: 2,
            start_date: now,
            last_restocked_at: now,
            snoozed_until: Some(now),
        };

        let update = MedicineUpdate {
            total_quantity: Some(90),
            last_restocked_at: None,
            snoozed_until: Some(None),
        };
        update.apply(&mut record);

        assert_eq!(record.total_quantity, 90);
        assert_eq!(record.last_restocked_at, now);
        assert_eq!(record.snoozed_until, None);
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let now = Utc::now();
        let record = MedicineRecord {
            id: Uuid::new_v4(),
            name: "Atorvastatin".into(),
            total_quantity: 28,
            dosage_per_day: 1,
            start_date: now,
            last_restocked_at: now,
            snoozed_until: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: MedicineRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.total_quantity, 28);
        assert_eq!(parsed.snoozed_until, None);
    }
}
