//! Alert delivery handoff.
//!
//! The sweep never talks to a mailer directly: due alerts are composed here
//! and appended to a JSONL outbox with file locking, and an external worker
//! drains the outbox. A slow or failing transport can therefore never stall
//! record evaluation.

use crate::{LowStockAlert, MedicineRecord, Result, StockLevel};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Delivery collaborator contract
///
/// Failure is retryable: the low-stock condition persists, so the next
/// sweep tick retries naturally.
pub trait Notifier {
    fn deliver(&mut self, alert: &LowStockAlert) -> Result<()>;
}

/// Compose the alert message for a low record at one instant
pub fn compose_alert(
    record: &MedicineRecord,
    level: StockLevel,
    recipient: &str,
    now: DateTime<Utc>,
) -> LowStockAlert {
    let subject = format!("Low stock reminder: {}", record.name);
    let body = format!(
        "{} is running low: {} pill(s) left, about {} day(s) of supply at {} per day.\n\
         Restock soon, or snooze this reminder to pause alerts for a while.",
        record.name, level.current_stock, level.days_left, record.dosage_per_day
    );

    LowStockAlert {
        medicine_id: record.id,
        medicine_name: record.name.clone(),
        current_stock: level.current_stock,
        days_left: level.days_left,
        recipient: recipient.to_string(),
        subject,
        body,
        queued_at: now,
    }
}

/// JSONL-based alert outbox with file locking
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    /// Create a new outbox for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create an outbox at the conventional file inside a data directory
    pub fn open(data_dir: &Path) -> Self {
        Self::new(data_dir.join("outbox.jsonl"))
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Notifier for OutboxNotifier {
    fn deliver(&mut self, alert: &LowStockAlert) -> Result<()> {
        self.ensure_parent_dir()
            .map_err(|e| crate::Error::Delivery(format!("outbox dir: {}", e)))?;

        let append = || -> Result<()> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;

            file.lock_exclusive()?;

            let mut writer = std::io::BufWriter::new(&file);
            let line = serde_json::to_string(alert)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;

            file.unlock()?;
            Ok(())
        };
        append().map_err(|e| crate::Error::Delivery(format!("outbox append: {}", e)))?;

        tracing::debug!(
            "Queued low-stock alert for {} ({})",
            alert.medicine_name,
            alert.medicine_id
        );
        Ok(())
    }
}

/// Read all queued alerts from an outbox file
pub fn read_outbox(path: &Path) -> Result<Vec<LowStockAlert>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut alerts = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<LowStockAlert>(&line) {
            Ok(alert) => alerts.push(alert),
            Err(e) => {
                tracing::warn!("Failed to parse alert at line {}: {}", line_num + 1, e);
                // Continue reading, don't fail completely
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} alerts from outbox", alerts.len());
    Ok(alerts)
}
