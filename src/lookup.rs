//! Read-only lookups used by the transform
//!
//! These are plain read transactions with no locking. Two identical
//! submissions racing in separate requests can both pass the duplicate check.

use redb::ReadableDatabase;

use crate::database::{
    enquiry_key, Store, TABLE_ENQUIRY_INDEX, TABLE_PROPERTY_NAME_INDEX, TABLE_USER_PHONE_INDEX,
};
use crate::error::StoreError;

impl Store {
    /// Returns true if an enquiry already exists for this phone number and property
    ///
    /// The property name is normalized the same way it is at write time, so
    /// "DSR The Address" and "dsr the address" hit the same entry.
    pub fn is_duplicate(&self, phone_number: &str, property_name: &str) -> Result<bool, StoreError> {
        let key = enquiry_key(phone_number, property_name);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_ENQUIRY_INDEX)?;
        let found = table.get(key.as_str())?.is_some();
        Ok(found)
    }

    /// Finds the userId registered for a phone number
    pub fn find_existing_user(&self, phone_number: &str) -> Result<Option<String>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_USER_PHONE_INDEX)?;
        let user_id = table.get(phone_number)?.map(|guard| guard.value().to_string());
        Ok(user_id)
    }

    /// Resolves a project name to a propertyId by exact match
    ///
    /// A missing name or an unknown project is not an error: it is logged and
    /// the caller gets `None`.
    pub fn resolve_property(&self, project_name: Option<&str>) -> Result<Option<String>, StoreError> {
        let project_name = match project_name.filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => {
                tracing::warn!("No project name provided");
                return Ok(None);
            }
        };

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_PROPERTY_NAME_INDEX)?;
        let property_id = table.get(project_name)?.map(|guard| guard.value().to_string());

        match &property_id {
            Some(id) => tracing::debug!("Found propertyId {} for {}", id, project_name),
            None => tracing::warn!("Property not found with name: {}", project_name),
        }
        Ok(property_id)
    }
}
