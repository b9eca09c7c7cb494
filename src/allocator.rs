//! Sequential, human-readable ID allocation
//!
//! Each namespace owns a counter document in `TABLE_COUNTERS`. Allocation
//! reads and bumps that document inside one redb write transaction; redb
//! allows a single writer at a time, so two callers can never observe the
//! same count.

use redb::ReadableTable;
use serde_json::{Map, Value};

use crate::database::{Store, TABLE_COUNTERS};
use crate::error::StoreError;

/// Minimum number of digits in an allocated id
pub const PAD_WIDTH: usize = 3;

/// Counter scopes used by the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    User,
    Lead,
    Enquiry,
}

impl Namespace {
    /// Path of the counter document backing this namespace
    pub fn path(self) -> &'static str {
        match self {
            Namespace::User => "admin/lastUser",
            Namespace::Lead => "admin/lastLead",
            Namespace::Enquiry => "admin/lastEnquiry",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::User => "user",
            Namespace::Lead => "lead",
            Namespace::Enquiry => "enq",
        }
    }
}

/// Formats an id as `prefix` followed by `count` zero-padded to `PAD_WIDTH`
///
/// Wider numbers are kept whole: `format_id("user", 1000)` is `"user1000"`.
pub fn format_id(prefix: &str, count: u64) -> String {
    format!("{}{:0width$}", prefix, count, width = PAD_WIDTH)
}

impl Store {
    /// Allocates the next id in the namespace stored at `counter_path`
    ///
    /// A missing counter document, or one without a `count` field, counts as
    /// zero. Only `count` is rewritten; other fields on the document are kept.
    /// If the transaction fails nothing is committed and the error is returned.
    pub fn allocate(&self, counter_path: &str, prefix: &str) -> Result<String, StoreError> {
        let write_txn = self.db.begin_write()?;
        let next = {
            let mut table = write_txn.open_table(TABLE_COUNTERS)?;

            let mut document: Map<String, Value> = match table.get(counter_path)? {
                Some(guard) => serde_json::from_str(guard.value())?,
                None => Map::new(),
            };
            let current = document.get("count").and_then(Value::as_u64).unwrap_or(0);
            let next = current + 1;

            document.insert("count".to_string(), Value::from(next));
            let json = serde_json::to_string(&document)?;
            table.insert(counter_path, json.as_str())?;
            next
        };
        write_txn.commit()?;

        Ok(format_id(prefix, next))
    }

    /// Allocates the next id for one of the built-in namespaces
    pub fn allocate_in(&self, namespace: Namespace) -> Result<String, StoreError> {
        let id = self.allocate(namespace.path(), namespace.prefix())?;
        tracing::debug!("Allocated {} from {}", id, namespace.path());
        Ok(id)
    }

    /// Current count of a counter document, zero when absent
    pub fn counter_value(&self, counter_path: &str) -> Result<u64, StoreError> {
        let document = self.get_document(TABLE_COUNTERS, counter_path)?;
        Ok(document
            .as_ref()
            .and_then(|doc| doc.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }
}
