//! Recurring sweep over all medicine records.
//!
//! Each tick loads every record, derives its stock level, asks the
//! notification policy whether an alert is due, dispatches due alerts, and
//! applies the post-delivery cooldown. The loop runs on one thread, so
//! ticks can never overlap.

use crate::{
    clock::Clock, config::AlertConfig, notify, notify::Notifier, policy, stock, store::Store,
    Result, StockStatus, SweepReport,
};
use chrono::Duration;
use std::sync::mpsc::{Receiver, RecvTimeoutError};

/// Owns one sweep loop over an injected store, notifier, and clock
pub struct Sweeper<S: Store, N: Notifier, C: Clock> {
    store: S,
    notifier: N,
    clock: C,
    threshold_days: i64,
    snooze_duration: Duration,
    recipient: String,
}

impl<S: Store, N: Notifier, C: Clock> Sweeper<S, N, C> {
    /// Build a sweeper from its collaborators and the alert settings
    pub fn new(store: S, notifier: N, clock: C, alerts: &AlertConfig) -> Self {
        Self {
            store,
            notifier,
            clock,
            threshold_days: alerts.low_stock_threshold_days,
            snooze_duration: alerts.snooze_duration(),
            recipient: alerts.recipient.clone(),
        }
    }

    /// Evaluate every record once and dispatch due alerts
    ///
    /// A store read failure aborts the whole tick (the caller simply waits
    /// for the next one). A delivery or per-record persistence failure is
    /// logged and that record skipped; remaining records still process. The
    /// record's cooldown is applied only after its alert was handed to the
    /// notifier, so a failed delivery is retried next tick.
    pub fn tick(&mut self) -> Result<SweepReport> {
        let now = self.clock.now();
        let records = self.store.find_all()?;
        let mut report = SweepReport::default();

        for record in &records {
            report.evaluated += 1;
            let level = stock::evaluate(record, now);

            match policy::status(record, level, now, self.threshold_days) {
                StockStatus::Ok => {}
                StockStatus::LowSuppressed => {
                    report.suppressed += 1;
                    tracing::debug!(
                        "{} is low but snoozed until {:?}",
                        record.name,
                        record.snoozed_until
                    );
                }
                StockStatus::LowEligible => {
                    let alert = notify::compose_alert(record, level, &self.recipient, now);
                    if let Err(e) = self.notifier.deliver(&alert) {
                        tracing::warn!(
                            "Alert delivery failed for {} ({}): {}",
                            record.name,
                            record.id,
                            e
                        );
                        report.delivery_failures += 1;
                        continue;
                    }
                    report.alerts_sent += 1;
                    tracing::info!(
                        "Low-stock alert sent for {} ({} day(s) left)",
                        record.name,
                        level.days_left
                    );

                    // Cooldown so the next tick does not repeat the alert
                    let update = policy::snooze(now, self.snooze_duration);
                    match self.store.update(record.id, &update) {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            tracing::debug!("{} deleted mid-sweep, skipping cooldown", record.name)
                        }
                        Err(e) => {
                            tracing::warn!("Failed to record cooldown for {}: {}", record.name, e)
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Sweep complete: {} evaluated, {} alerted, {} suppressed, {} delivery failures",
            report.evaluated,
            report.alerts_sent,
            report.suppressed,
            report.delivery_failures
        );
        Ok(report)
    }

    /// Run the sweep loop at a fixed cadence until shut down
    ///
    /// Runs on the calling thread; one tick finishes before the next wait
    /// begins, so sweeps never overlap. A failed tick is logged and the
    /// loop waits for the next interval. The loop ends when the shutdown
    /// channel receives a signal or its sender is dropped.
    pub fn run(&mut self, interval: std::time::Duration, shutdown: Receiver<()>) {
        tracing::info!("Sweep loop started, ticking every {:?}", interval);
        loop {
            if let Err(e) = self.tick() {
                tracing::warn!("Sweep tick failed: {}", e);
            }

            match shutdown.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        tracing::info!("Sweep loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use crate::{Error, LowStockAlert, MedicineRecord, MedicineUpdate, NewMedicine};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    /// Notifier that records delivered alerts, optionally failing by name
    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<LowStockAlert>>>,
        fail_for: Option<String>,
    }

    impl Notifier for RecordingNotifier {
        fn deliver(&mut self, alert: &LowStockAlert) -> Result<()> {
            if self.fail_for.as_deref() == Some(alert.medicine_name.as_str()) {
                return Err(Error::Delivery("mailer offline".into()));
            }
            self.sent.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    /// Store whose reads always fail
    struct OutageStore;

    impl Store for OutageStore {
        fn find_all(&self) -> Result<Vec<MedicineRecord>> {
            Err(Error::StoreUnavailable("backend down".into()))
        }
        fn find_by_id(&self, _id: Uuid) -> Result<Option<MedicineRecord>> {
            Err(Error::StoreUnavailable("backend down".into()))
        }
        fn create(&self, _new: NewMedicine, _now: DateTime<Utc>) -> Result<MedicineRecord> {
            Err(Error::StoreUnavailable("backend down".into()))
        }
        fn update(
            &self,
            _id: Uuid,
            _update: &MedicineUpdate,
        ) -> Result<Option<MedicineRecord>> {
            Err(Error::StoreUnavailable("backend down".into()))
        }
        fn delete(&self, _id: Uuid) -> Result<bool> {
            Err(Error::StoreUnavailable("backend down".into()))
        }
    }

    fn day_zero() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap()
    }

    fn record(name: &str, total_quantity: i64, dosage_per_day: i64) -> MedicineRecord {
        MedicineRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            total_quantity,
            dosage_per_day,
            start_date: day_zero(),
            last_restocked_at: day_zero(),
            snoozed_until: None,
        }
    }

    fn alerts() -> AlertConfig {
        AlertConfig::default()
    }

    fn sweeper_at(
        store: MemoryStore,
        notifier: RecordingNotifier,
        now: DateTime<Utc>,
    ) -> Sweeper<MemoryStore, RecordingNotifier, FixedClock> {
        Sweeper::new(store, notifier, FixedClock(now), &alerts())
    }

    #[test]
    fn test_tick_alerts_exhausted_record() {
        let store = MemoryStore::with_records(vec![record("Amlodipine", 30, 3)]);
        let notifier = RecordingNotifier::default();
        let now = day_zero() + Duration::days(10);

        let report = sweeper_at(store.clone(), notifier.clone(), now)
            .tick()
            .unwrap();

        assert_eq!(report.evaluated, 1);
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(report.delivery_failures, 0);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].medicine_name, "Amlodipine");
        assert_eq!(sent[0].days_left, 0);

        // Cooldown applied after delivery
        let records = store.find_all().unwrap();
        assert_eq!(records[0].snoozed_until, Some(now + Duration::minutes(60)));
    }

    #[test]
    fn test_tick_ignores_healthy_record() {
        let store = MemoryStore::with_records(vec![record("Amlodipine", 30, 1)]);
        let notifier = RecordingNotifier::default();

        let report = sweeper_at(store.clone(), notifier.clone(), day_zero())
            .tick()
            .unwrap();

        assert_eq!(report.evaluated, 1);
        assert_eq!(report.alerts_sent, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(store.find_all().unwrap()[0].snoozed_until, None);
    }

    #[test]
    fn test_second_tick_within_cooldown_is_suppressed() {
        let store = MemoryStore::with_records(vec![record("Amlodipine", 30, 3)]);
        let notifier = RecordingNotifier::default();
        let first = day_zero() + Duration::days(10);

        sweeper_at(store.clone(), notifier.clone(), first)
            .tick()
            .unwrap();
        let report = sweeper_at(store.clone(), notifier.clone(), first + Duration::minutes(30))
            .tick()
            .unwrap();

        assert_eq!(report.alerts_sent, 0);
        assert_eq!(report.suppressed, 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_alert_refires_after_cooldown_lapses() {
        let store = MemoryStore::with_records(vec![record("Amlodipine", 30, 3)]);
        let notifier = RecordingNotifier::default();
        let first = day_zero() + Duration::days(10);

        sweeper_at(store.clone(), notifier.clone(), first)
            .tick()
            .unwrap();
        let report = sweeper_at(store.clone(), notifier.clone(), first + Duration::minutes(61))
            .tick()
            .unwrap();

        assert_eq!(report.alerts_sent, 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_delivery_failure_skips_record_but_not_others() {
        let store = MemoryStore::with_records(vec![
            record("Amlodipine", 30, 3),
            record("Bisoprolol", 30, 3),
        ]);
        let notifier = RecordingNotifier {
            fail_for: Some("Amlodipine".into()),
            ..Default::default()
        };
        let now = day_zero() + Duration::days(10);

        let report = sweeper_at(store.clone(), notifier.clone(), now)
            .tick()
            .unwrap();

        assert_eq!(report.evaluated, 2);
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(report.delivery_failures, 1);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].medicine_name, "Bisoprolol");

        // No cooldown for the failed record: the next tick retries it
        let records = store.find_all().unwrap();
        let failed = records.iter().find(|r| r.name == "Amlodipine").unwrap();
        let delivered = records.iter().find(|r| r.name == "Bisoprolol").unwrap();
        assert_eq!(failed.snoozed_until, None);
        assert!(delivered.snoozed_until.is_some());
    }

    #[test]
    fn test_store_outage_aborts_tick() {
        let mut sweeper = Sweeper::new(
            OutageStore,
            RecordingNotifier::default(),
            FixedClock(day_zero()),
            &alerts(),
        );

        assert!(matches!(
            sweeper.tick(),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_deleted_record_leaves_sweep() {
        let med = record("Amlodipine", 30, 3);
        let store = MemoryStore::with_records(vec![med.clone()]);
        let notifier = RecordingNotifier::default();
        let now = day_zero() + Duration::days(10);

        store.delete(med.id).unwrap();
        let report = sweeper_at(store, notifier.clone(), now).tick().unwrap();

        assert_eq!(report.evaluated, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_run_loop_ticks_until_shutdown() {
        /// Clock that counts how often the loop asked for the time
        #[derive(Clone)]
        struct CountingClock {
            calls: Arc<AtomicUsize>,
            instant: DateTime<Utc>,
        }

        impl Clock for CountingClock {
            fn now(&self) -> DateTime<Utc> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.instant
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let clock = CountingClock {
            calls: calls.clone(),
            instant: day_zero(),
        };
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let mut sweeper = Sweeper::new(
                MemoryStore::default(),
                RecordingNotifier::default(),
                clock,
                &alerts(),
            );
            sweeper.run(std::time::Duration::from_millis(5), rx);
        });

        // Give the loop time for at least one tick, then stop it
        std::thread::sleep(std::time::Duration::from_millis(30));
        tx.send(()).unwrap();
        handle.join().unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
