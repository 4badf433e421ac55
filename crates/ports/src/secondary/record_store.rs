use domain::alert::error::AlertError;
use domain::query::Query;
use domain::record::Record;

/// Pluggable flat-record store backing the alert handler.
///
/// Implementations may use redb or in-memory storage. Query results are
/// returned oldest first (by assigned timestamp, then insertion order).
pub trait RecordStore: Send + Sync {
    /// Persist a record, assigning it a fresh unique ID and, if the
    /// record does not already carry one, an arrival timestamp.
    /// Returns the assigned ID.
    fn store(&self, record: Record) -> Result<String, AlertError>;

    /// All records matching `query`, oldest first.
    fn query(&self, query: &Query) -> Result<Vec<Record>, AlertError>;

    /// Delete every record matching `query`.
    fn delete(&self, query: &Query) -> Result<(), AlertError>;

    /// Mark every record matching `query` as pending for `rule_name`,
    /// keeping its ID and timestamp intact. Flagged records survive
    /// eviction.
    fn flag(&self, query: &Query, rule_name: &str) -> Result<(), AlertError>;

    /// Drop every record that is not flagged for any rule. Idempotent.
    fn eviction(&self) -> Result<(), AlertError>;

    /// Drop all records, flagged or not.
    fn cleanup(&self) -> Result<(), AlertError>;

    /// Every stored record, oldest first.
    fn list(&self) -> Result<Vec<Record>, AlertError>;
}
