//! Medicine record store with file locking.
//!
//! The shipped backend keeps all records in a single JSON file, guarded by
//! shared/exclusive locks and replaced atomically on every write so a CLI
//! restock and a running sweep can interleave safely.

use crate::{Error, MedicineRecord, MedicineUpdate, NewMedicine, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Record store contract consumed by the sweep and the CLI
///
/// Backend outages surface as [`Error::StoreUnavailable`]; absent records
/// surface as `Ok(None)` / `Ok(false)` so callers decide whether that is an
/// error.
pub trait Store {
    fn find_all(&self) -> Result<Vec<MedicineRecord>>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<MedicineRecord>>;
    fn create(&self, new: NewMedicine, now: DateTime<Utc>) -> Result<MedicineRecord>;
    fn update(&self, id: Uuid, update: &MedicineUpdate) -> Result<Option<MedicineRecord>>;
    fn delete(&self, id: Uuid) -> Result<bool>;
}

/// JSON-file-backed store
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store over the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store over the conventional file inside a data directory
    pub fn open(data_dir: &Path) -> Self {
        Self::new(data_dir.join("medicines.json"))
    }

    /// Load all records with a shared lock
    ///
    /// A missing file is an empty store; unreadable or unparsable content is
    /// a backend outage, never silently discarded.
    fn load_records(&self) -> Result<Vec<MedicineRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| Error::StoreUnavailable(format!("open {:?}: {}", self.path, e)))?;

        file.lock_shared()
            .map_err(|e| Error::StoreUnavailable(format!("lock {:?}: {}", self.path, e)))?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read_result = reader.read_to_string(&mut contents);
        let _ = file.unlock();
        read_result
            .map_err(|e| Error::StoreUnavailable(format!("read {:?}: {}", self.path, e)))?;

        let records = serde_json::from_str::<Vec<MedicineRecord>>(&contents).map_err(|e| {
            tracing::warn!("Store file {:?} is corrupt: {}", self.path, e);
            Error::StoreUnavailable(format!("corrupt store file {:?}: {}", self.path, e))
        })?;

        tracing::debug!("Loaded {} medicine records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Save all records with an exclusive lock
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn save_records(&self, records: &[MedicineRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::StoreUnavailable(format!("create {:?}: {}", parent, e)))?;
        }

        let parent = self.path.parent().ok_or_else(|| {
            Error::StoreUnavailable(format!("store path {:?} missing parent", self.path))
        })?;
        let temp = NamedTempFile::new_in(parent)
            .map_err(|e| Error::StoreUnavailable(format!("temp file in {:?}: {}", parent, e)))?;

        temp.as_file()
            .lock_exclusive()
            .map_err(|e| Error::StoreUnavailable(format!("lock temp file: {}", e)))?;

        let write_result = (|| -> Result<()> {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(records)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
            Ok(())
        })();
        write_result.map_err(|e| Error::StoreUnavailable(format!("write store file: {}", e)))?;

        temp.as_file()
            .sync_all()
            .map_err(|e| Error::StoreUnavailable(format!("sync store file: {}", e)))?;
        let _ = temp.as_file().unlock();

        temp.persist(&self.path)
            .map_err(|e| Error::StoreUnavailable(format!("replace {:?}: {}", self.path, e.error)))?;

        tracing::debug!("Saved {} medicine records to {:?}", records.len(), self.path);
        Ok(())
    }
}

impl Store for FileStore {
    fn find_all(&self) -> Result<Vec<MedicineRecord>> {
        self.load_records()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<MedicineRecord>> {
        Ok(self.load_records()?.into_iter().find(|r| r.id == id))
    }

    fn create(&self, new: NewMedicine, now: DateTime<Utc>) -> Result<MedicineRecord> {
        new.validate()?;

        let record = MedicineRecord {
            id: Uuid::new_v4(),
            name: new.name,
            total_quantity: new.total_quantity,
            dosage_per_day: new.dosage_per_day,
            start_date: now,
            last_restocked_at: now,
            snoozed_until: None,
        };

        let mut records = self.load_records()?;
        records.push(record.clone());
        self.save_records(&records)?;

        tracing::info!("Registered medicine {} ({})", record.name, record.id);
        Ok(record)
    }

    fn update(&self, id: Uuid, update: &MedicineUpdate) -> Result<Option<MedicineRecord>> {
        let mut records = self.load_records()?;

        let updated = match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                update.apply(record);
                record.clone()
            }
            None => return Ok(None),
        };

        self.save_records(&records)?;
        tracing::debug!("Updated medicine {}", id);
        Ok(Some(updated))
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.load_records()?;
        let before = records.len();
        records.retain(|r| r.id != id);

        if records.len() == before {
            return Ok(false);
        }

        self.save_records(&records)?;
        tracing::info!("Deleted medicine {}", id);
        Ok(true)
    }
}

/// In-memory store for exercising the sweep without a filesystem
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    records: std::sync::Arc<std::sync::Mutex<Vec<MedicineRecord>>>,
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn with_records(records: Vec<MedicineRecord>) -> Self {
        Self {
            records: std::sync::Arc::new(std::sync::Mutex::new(records)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MedicineRecord>> {
        self.records.lock().unwrap()
    }
}

#[cfg(test)]
impl Store for MemoryStore {
    fn find_all(&self) -> Result<Vec<MedicineRecord>> {
        Ok(self.lock().clone())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<MedicineRecord>> {
        Ok(self.lock().iter().find(|r| r.id == id).cloned())
    }

    fn create(&self, new: NewMedicine, now: DateTime<Utc>) -> Result<MedicineRecord> {
        new.validate()?;
        let record = MedicineRecord {
            id: Uuid::new_v4(),
            name: new.name,
            total_quantity: new.total_quantity,
            dosage_per_day: new.dosage_per_day,
            start_date: now,
            last_restocked_at: now,
            snoozed_until: None,
        };
        self.lock().push(record.clone());
        Ok(record)
    }

    fn update(&self, id: Uuid, update: &MedicineUpdate) -> Result<Option<MedicineRecord>> {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                update.apply(record);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}
