pub mod memory_record_store;
pub mod redb_record_store;

pub use memory_record_store::MemoryRecordStore;
pub use redb_record_store::RedbRecordStore;
