//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database used as the
//! document store. Every collection is a `&str -> &str` table holding JSON
//! documents; lookups by phone number, property pair or project name go
//! through secondary index tables.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{PropertyRecord, StagedSubmission, Submission, TransformedRecord, UserRecord};
use crate::transform::LeadTransformer;

/// Counter documents addressed by path, e.g. "admin/lastUser" -> '{"count":7}'
pub const TABLE_COUNTERS: TableDefinition<&str, &str> = TableDefinition::new("counters_v1");

/// User documents keyed by userId
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Phone number -> userId
pub const TABLE_USER_PHONE_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("user_phone_index_v1");

/// Lead documents keyed by leadId
pub const TABLE_LEADS: TableDefinition<&str, &str> = TableDefinition::new("leads_v1");

/// Enquiry documents keyed by enquiryId
pub const TABLE_ENQUIRIES: TableDefinition<&str, &str> = TableDefinition::new("enquiries_v1");

/// Index used by the duplicate check
///
/// Key: composite "{phone_number}:{normalized property name}"
/// Value: enquiryId
pub const TABLE_ENQUIRY_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("enquiry_index_v1");

/// Property documents keyed by propertyId
pub const TABLE_PROPERTIES: TableDefinition<&str, &str> = TableDefinition::new("properties_v1");

/// Exact project name -> propertyId
pub const TABLE_PROPERTY_NAME_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("property_name_index_v1");

/// Raw submissions keyed by a random UUID, written before transforming
pub const TABLE_SUBMISSIONS: TableDefinition<&str, &str> = TableDefinition::new("submissions_v1");

/// Handle to the document store
///
/// Cheap to share behind an `Arc`; redb serializes write transactions so the
/// handle is safe for concurrent use.
pub struct Store {
    pub(crate) db: Database,
}

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub transformer: LeadTransformer,
    /// When set, the webhook requires a matching Authorization header
    pub webhook_token: Option<String>,
}

/// Initializes the embedded database and creates all tables
///
/// # Example
///
/// ```no_run
/// # use lead_intake::database::init_db;
/// let store = init_db("leads.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Store, StoreError> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_COUNTERS)?;
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_USER_PHONE_INDEX)?;
        write_txn.open_table(TABLE_LEADS)?;
        write_txn.open_table(TABLE_ENQUIRIES)?;
        write_txn.open_table(TABLE_ENQUIRY_INDEX)?;
        write_txn.open_table(TABLE_PROPERTIES)?;
        write_txn.open_table(TABLE_PROPERTY_NAME_INDEX)?;
        write_txn.open_table(TABLE_SUBMISSIONS)?;
    }
    write_txn.commit()?;

    Ok(Store { db })
}

/// Normalizes a property name for storage and for the duplicate index
pub fn normalize_property_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Composite key of the duplicate index
pub fn enquiry_key(phone_number: &str, property_name: &str) -> String {
    format!("{}:{}", phone_number, normalize_property_name(property_name))
}

impl Store {
    /// Raw access to the underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Returns true if a read transaction can be opened against the store
    pub fn ping(&self) -> bool {
        match self.db.begin_read() {
            Ok(txn) => txn.open_table(TABLE_COUNTERS).is_ok(),
            Err(e) => {
                tracing::warn!("Store ping failed: {}", e);
                false
            }
        }
    }

    /// Reads a document from any collection and returns it as JSON
    pub fn get_document(
        &self,
        table: TableDefinition<'static, &'static str, &'static str>,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let document = match table.get(key)? {
            Some(guard) => Some(serde_json::from_str(guard.value())?),
            None => None,
        };
        Ok(document)
    }

    /// Writes each submission verbatim to the staging collection
    ///
    /// Returns the generated staging keys in input order.
    pub fn stage_submissions(
        &self,
        submissions: &[Submission],
        received_at: i64,
    ) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::with_capacity(submissions.len());

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_SUBMISSIONS)?;
            for submission in submissions {
                let staged = StagedSubmission {
                    submission: submission.clone(),
                    added: received_at,
                };
                let key = Uuid::new_v4().to_string();
                let json = serde_json::to_string(&staged)?;
                table.insert(key.as_str(), json.as_str())?;
                keys.push(key);
            }
        }
        write_txn.commit()?;

        tracing::debug!("Staged {} submission(s)", keys.len());
        Ok(keys)
    }

    /// Inserts or replaces property documents and their name index entries
    pub fn seed_properties(&self, properties: &[PropertyRecord]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_PROPERTIES)?;
            let mut index = write_txn.open_table(TABLE_PROPERTY_NAME_INDEX)?;
            for property in properties {
                let json = serde_json::to_string(property)?;
                table.insert(property.property_id.as_str(), json.as_str())?;
                index.insert(
                    property.project_name.as_str(),
                    property.property_id.as_str(),
                )?;
            }
        }
        write_txn.commit()?;

        tracing::info!("Seeded {} propert(ies)", properties.len());
        Ok(())
    }

    /// Persists transformed records in a single write transaction
    ///
    /// A user whose phone number is not indexed yet is inserted under its
    /// allocated id. Otherwise the submission is merged into the stored user
    /// (history snapshot, UTM and campaign data, `lastModified`), and the lead
    /// and enquiry are pointed at the indexed userId. That covers a concurrent
    /// request that allocated a different id for the same new phone number.
    pub fn persist(&self, records: &[TransformedRecord]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            let mut phone_index = write_txn.open_table(TABLE_USER_PHONE_INDEX)?;
            let mut leads = write_txn.open_table(TABLE_LEADS)?;
            let mut enquiries = write_txn.open_table(TABLE_ENQUIRIES)?;
            let mut enquiry_index = write_txn.open_table(TABLE_ENQUIRY_INDEX)?;

            for record in records {
                let incoming = &record.user;
                let indexed = phone_index
                    .get(incoming.phone_number.as_str())?
                    .map(|guard| guard.value().to_string());

                let stored = match &indexed {
                    Some(user_id) => {
                        let stored = users
                            .get(user_id.as_str())?
                            .map(|guard| serde_json::from_str::<UserRecord>(guard.value()))
                            .transpose()?;
                        match stored {
                            Some(mut user) => {
                                user.merge_submission(incoming);
                                user
                            }
                            // Index entry without a document: rebuild it from this submission
                            None => UserRecord {
                                user_id: user_id.clone(),
                                ..incoming.clone()
                            },
                        }
                    }
                    None => incoming.clone(),
                };
                let stored = UserRecord {
                    already_exists: false,
                    ..stored
                };

                if stored.user_id != incoming.user_id {
                    tracing::warn!(
                        "Phone {} already belongs to {}, relinking records from {}",
                        incoming.phone_number,
                        stored.user_id,
                        incoming.user_id
                    );
                }

                let json = serde_json::to_string(&stored)?;
                users.insert(stored.user_id.as_str(), json.as_str())?;
                phone_index.insert(stored.phone_number.as_str(), stored.user_id.as_str())?;

                let mut lead = record.lead.clone();
                lead.pipeline.user_id = stored.user_id.clone();
                let json = serde_json::to_string(&lead)?;
                leads.insert(lead.lead_id.as_str(), json.as_str())?;

                let mut enquiry = record.enquiry.clone();
                enquiry.pipeline.user_id = stored.user_id.clone();
                let json = serde_json::to_string(&enquiry)?;
                enquiries.insert(enquiry.enquiry_id.as_str(), json.as_str())?;

                let key = enquiry_key(
                    &enquiry.pipeline.phone_number,
                    &enquiry.pipeline.property_name,
                );
                enquiry_index.insert(key.as_str(), enquiry.enquiry_id.as_str())?;
            }
        }
        write_txn.commit()?;

        tracing::info!("Persisted {} record(s)", records.len());
        Ok(())
    }
}
