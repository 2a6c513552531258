pub mod in_memory;
pub mod sqlite_audit_store;

pub use in_memory::InMemoryAuditStore;
pub use sqlite_audit_store::SqliteAuditStore;
