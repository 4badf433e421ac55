use std::path::Path;
use std::sync::Mutex;

use domain::alert::error::AlertError;
use domain::query::Query;
use domain::record::{ALERT_RULE, ALERT_TIMESTAMP, ALERT_UUID, Record, now_millis};
use ports::secondary::record_store::RecordStore;
use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

/// redb table: key = record UUID, value = JSON-serialized `Record`.
const RECORD_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Persistent record store backed by redb, so pending period and
/// recoverable state survives a restart.
pub struct RedbRecordStore {
    db: Database,
    /// Serialize writers so flag/delete/eviction scan-then-write pairs
    /// do not interleave.
    write_lock: Mutex<()>,
}

impl RedbRecordStore {
    /// Open (or create) a redb database at `path`.
    pub fn open(path: &Path) -> Result<Self, AlertError> {
        let db = Database::create(path)
            .map_err(|e| AlertError::StoreFailed(format!("redb open failed: {e}")))?;

        // Ensure the table exists.
        let txn = db
            .begin_write()
            .map_err(|e| AlertError::StoreFailed(format!("redb txn begin: {e}")))?;
        {
            let _table = txn
                .open_table(RECORD_TABLE)
                .map_err(|e| AlertError::StoreFailed(format!("redb table create: {e}")))?;
        }
        txn.commit()
            .map_err(|e| AlertError::StoreFailed(format!("redb commit: {e}")))?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn scan(&self) -> Result<Vec<Record>, AlertError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| AlertError::StoreFailed(format!("redb read txn: {e}")))?;
        let table = txn
            .open_table(RECORD_TABLE)
            .map_err(|e| AlertError::StoreFailed(format!("redb read table: {e}")))?;

        let mut records: Vec<Record> = table
            .iter()
            .map_err(|e| AlertError::StoreFailed(format!("redb iter: {e}")))?
            .filter_map(Result::ok)
            .filter_map(|(_k, v)| serde_json::from_slice::<Record>(v.value()).ok())
            .collect();
        records.sort_by_key(|record| record.timestamp_millis().unwrap_or(0));
        Ok(records)
    }

    /// Collect matching records in one read transaction, then apply
    /// `update` to each inside a single write transaction. `update`
    /// returns the rewritten record, or `None` to remove it.
    fn rewrite_matching(
        &self,
        query: &Query,
        update: impl Fn(Record) -> Option<Record>,
    ) -> Result<(), AlertError> {
        let _lock = self
            .write_lock
            .lock()
            .map_err(|e| AlertError::StoreFailed(format!("lock poisoned: {e}")))?;

        let matched: Vec<Record> = self
            .scan()?
            .into_iter()
            .filter(|record| query.matches(record))
            .collect();
        if matched.is_empty() {
            return Ok(());
        }

        let txn = self
            .db
            .begin_write()
            .map_err(|e| AlertError::StoreFailed(format!("redb write txn: {e}")))?;
        {
            let mut table = txn
                .open_table(RECORD_TABLE)
                .map_err(|e| AlertError::StoreFailed(format!("redb write table: {e}")))?;
            for record in matched {
                let Some(id) = record.uuid().map(str::to_string) else {
                    continue;
                };
                match update(record) {
                    Some(updated) => {
                        let value = serde_json::to_vec(&updated)
                            .map_err(|e| AlertError::StoreFailed(format!("serialize: {e}")))?;
                        table
                            .insert(id.as_str(), value.as_slice())
                            .map_err(|e| AlertError::StoreFailed(format!("redb insert: {e}")))?;
                    }
                    None => {
                        table
                            .remove(id.as_str())
                            .map_err(|e| AlertError::StoreFailed(format!("redb remove: {e}")))?;
                    }
                }
            }
        }
        txn.commit()
            .map_err(|e| AlertError::StoreFailed(format!("redb write commit: {e}")))?;
        Ok(())
    }
}

impl RecordStore for RedbRecordStore {
    fn store(&self, mut record: Record) -> Result<String, AlertError> {
        let _lock = self
            .write_lock
            .lock()
            .map_err(|e| AlertError::StoreFailed(format!("lock poisoned: {e}")))?;

        let id = Uuid::new_v4().to_string();
        record.insert(ALERT_UUID, id.clone());
        if !record.contains_field(ALERT_TIMESTAMP) {
            record.insert(ALERT_TIMESTAMP, now_millis());
        }
        let value = serde_json::to_vec(&record)
            .map_err(|e| AlertError::StoreFailed(format!("serialize: {e}")))?;

        let txn = self
            .db
            .begin_write()
            .map_err(|e| AlertError::StoreFailed(format!("redb write txn: {e}")))?;
        {
            let mut table = txn
                .open_table(RECORD_TABLE)
                .map_err(|e| AlertError::StoreFailed(format!("redb write table: {e}")))?;
            table
                .insert(id.as_str(), value.as_slice())
                .map_err(|e| AlertError::StoreFailed(format!("redb insert: {e}")))?;
        }
        txn.commit()
            .map_err(|e| AlertError::StoreFailed(format!("redb write commit: {e}")))?;
        Ok(id)
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>, AlertError> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|record| query.matches(record))
            .collect())
    }

    fn delete(&self, query: &Query) -> Result<(), AlertError> {
        self.rewrite_matching(query, |_record| None)
    }

    fn flag(&self, query: &Query, rule_name: &str) -> Result<(), AlertError> {
        self.rewrite_matching(query, |mut record| {
            record.insert(ALERT_RULE, rule_name);
            Some(record)
        })
    }

    fn eviction(&self) -> Result<(), AlertError> {
        self.rewrite_matching(&Query::not(Query::wildcard(ALERT_RULE, "*")), |_record| {
            None
        })
    }

    fn cleanup(&self) -> Result<(), AlertError> {
        self.rewrite_matching(&Query::wildcard(ALERT_UUID, "*"), |_record| None)
    }

    fn list(&self) -> Result<Vec<Record>, AlertError> {
        self.scan()
    }
}
