use std::sync::Mutex;

use domain::alert::error::AlertError;
use domain::query::Query;
use domain::record::{ALERT_RULE, ALERT_TIMESTAMP, ALERT_UUID, Record, now_millis};
use ports::secondary::record_store::RecordStore;
use uuid::Uuid;

/// In-memory record store. The default backend; state is lost on
/// restart, which matches the eviction model (only records pending a
/// period or recoverable rule matter across events).
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Record>>, AlertError> {
        self.records
            .lock()
            .map_err(|e| AlertError::StoreFailed(format!("lock poisoned: {e}")))
    }
}

impl RecordStore for MemoryRecordStore {
    fn store(&self, mut record: Record) -> Result<String, AlertError> {
        let id = Uuid::new_v4().to_string();
        record.insert(ALERT_UUID, id.clone());
        if !record.contains_field(ALERT_TIMESTAMP) {
            record.insert(ALERT_TIMESTAMP, now_millis());
        }
        self.lock()?.push(record);
        Ok(id)
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>, AlertError> {
        let records = self.lock()?;
        let mut matched: Vec<Record> = records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        matched.sort_by_key(|record| record.timestamp_millis().unwrap_or(0));
        Ok(matched)
    }

    fn delete(&self, query: &Query) -> Result<(), AlertError> {
        self.lock()?.retain(|record| !query.matches(record));
        Ok(())
    }

    fn flag(&self, query: &Query, rule_name: &str) -> Result<(), AlertError> {
        let mut records = self.lock()?;
        for record in records.iter_mut().filter(|record| query.matches(record)) {
            record.insert(ALERT_RULE, rule_name);
        }
        Ok(())
    }

    fn eviction(&self) -> Result<(), AlertError> {
        self.lock()?.retain(|record| record.contains_field(ALERT_RULE));
        Ok(())
    }

    fn cleanup(&self) -> Result<(), AlertError> {
        self.lock()?.clear();
        Ok(())
    }

    fn list(&self) -> Result<Vec<Record>, AlertError> {
        let records = self.lock()?;
        let mut all = records.clone();
        all.sort_by_key(|record| record.timestamp_millis().unwrap_or(0));
        Ok(all)
    }
}
