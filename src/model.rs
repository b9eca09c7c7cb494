//! Data models for the lead intake service
//!
//! This module defines the inbound submission payload, the documents written
//! to each collection, and the response returned by the webhook. Every
//! document is serialized as camelCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// One inbound campaign-form payload
///
/// # Example
/// ```json
/// {
///   "phoneNumber": "+911234567890",
///   "name": "A Kumar",
///   "campaign": true,
///   "projectName": "DSR The Address",
///   "utmDetails": { "source": "google" }
/// }
/// ```
#[derive(Serialize, Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[validate(length(min = 5, max = 20, message = "phoneNumber must be 5 to 20 characters"))]
    pub phone_number: String,

    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: String,

    pub campaign: bool,

    #[serde(default)]
    pub project_id: Option<String>,

    /// Required at the HTTP boundary; the transform tolerates its absence
    #[serde(default)]
    pub project_name: Option<String>,

    #[serde(default)]
    pub utm_details: Option<Map<String, Value>>,

    #[serde(default)]
    pub current_agent: Option<String>,

    #[serde(default)]
    pub current_agent_id: Option<String>,
}

/// Verbatim copy of an accepted submission, written before the transform runs
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StagedSubmission {
    #[serde(flatten)]
    pub submission: Submission,

    pub added: i64,
}

/// A sales agent attributed to a lead
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AgentAssignment {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A property document in the properties collection
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub property_id: String,
    pub project_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PhoneEntry {
    pub label: String,
    pub number: String,
    pub added_at: i64,
}

/// Canonical identity of a person, keyed by phone number
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub phone_number: String,
    pub name: String,
    pub campaign: bool,
    pub utm_details: Option<Map<String, Value>>,
    pub label: String,
    pub phone_numbers: Vec<PhoneEntry>,
    pub added: i64,
    pub last_modified: i64,

    /// Present when the user arrived through a campaign
    #[serde(default)]
    pub campaign_details: Option<CampaignDetails>,

    /// Snapshots taken each time a later submission was merged in
    #[serde(default)]
    pub history: Vec<UserHistoryEntry>,

    /// Set when the user was found by phone number instead of being created
    #[serde(default)]
    pub already_exists: bool,
}

impl UserRecord {
    /// Folds a later submission for the same phone number into a stored user
    ///
    /// The current campaign state is snapshotted into `history` first. UTM
    /// details are merged key by key, scalar campaign fields are replaced,
    /// and shared properties not seen before are appended.
    pub fn merge_submission(&mut self, update: &UserRecord) {
        self.history.push(UserHistoryEntry {
            utm_details: self.utm_details.clone(),
            shared_properties: self
                .campaign_details
                .as_ref()
                .map(|details| details.shared_properties.clone())
                .unwrap_or_default(),
            last_modified: self.last_modified,
            timestamp: update.last_modified,
        });

        if let Some(utm) = &update.utm_details {
            self.utm_details
                .get_or_insert_with(Map::new)
                .extend(utm.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(incoming) = &update.campaign_details {
            match &mut self.campaign_details {
                Some(current) => {
                    let mut shared = std::mem::take(&mut current.shared_properties);
                    for property in &incoming.shared_properties {
                        if !shared.iter().any(|p| p.id == property.id && p.name == property.name) {
                            shared.push(property.clone());
                        }
                    }
                    *current = CampaignDetails {
                        shared_properties: shared,
                        ..incoming.clone()
                    };
                }
                None => self.campaign_details = Some(incoming.clone()),
            }
        }

        self.campaign = self.campaign || update.campaign;
        self.last_modified = update.last_modified;
    }
}

/// Campaign metadata attached to a user created or updated by a campaign lead
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetails {
    pub source: String,
    pub sub_source: String,
    pub mode: String,
    pub customer_type: String,
    pub status: String,
    pub new_lead: bool,
    pub shared_properties: Vec<SharedProperty>,
}

/// A project the customer picked on the campaign form
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedProperty {
    pub name: String,
    pub id: Option<String>,
    pub status: String,
    pub recommended_by: String,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserHistoryEntry {
    pub utm_details: Option<Map<String, Value>>,
    pub shared_properties: Vec<SharedProperty>,
    pub last_modified: i64,
    pub timestamp: i64,
}

/// Follow-up task scheduled for the assigned agent
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpTask {
    pub task_id: String,
    pub task_name: String,
    pub action_type: String,
    pub agent: String,
    pub schedule: i64,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub task_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AgentHistoryEntry {
    pub agent_id: String,
    pub agent_name: String,
    pub timestamp: i64,
    pub last_stage: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub activity_type: String,
    pub timestamp: i64,
    pub agent_name: String,
    pub data: Map<String, Value>,
}

/// Fields shared by lead and enquiry documents
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub user_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub agent_email: String,
    pub property_name: String,
    pub property_id: Option<String>,
    pub root_property_name: Option<String>,
    pub root_property_id: Option<String>,
    pub name: String,
    pub phone_number: String,
    pub label: String,
    pub source: String,
    pub lead_status: Option<String>,
    pub stage: Option<String>,
    pub state: String,
    pub tag: Option<String>,
    pub task_type: Option<String>,
    pub scheduled_date: Option<i64>,
    pub rnr: bool,
    pub rnr_count: u32,
    #[serde(default)]
    pub tasks: Vec<FollowUpTask>,
    pub agent_history: Vec<AgentHistoryEntry>,
    pub activity_history: Vec<ActivityEntry>,
    pub notes: Vec<Value>,
    pub documents: Vec<Value>,
    pub requirements: Vec<Value>,
    pub added: i64,
    pub last_modified: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub lead_id: String,

    #[serde(flatten)]
    pub pipeline: Pipeline,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryRecord {
    pub enquiry_id: String,
    pub lead_id: String,

    #[serde(flatten)]
    pub pipeline: Pipeline,
}

/// Everything produced for one non-duplicate submission
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransformedRecord {
    pub user: UserRecord,
    pub lead: LeadRecord,
    pub enquiry: EnquiryRecord,
}

/// Summary of one created record, as returned by the webhook
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSummary {
    pub user_id: String,
    pub lead_id: String,
    pub enquiry_id: String,
    pub already_exists: bool,
}

impl From<&TransformedRecord> for CreatedSummary {
    fn from(record: &TransformedRecord) -> Self {
        Self {
            user_id: record.user.user_id.clone(),
            lead_id: record.lead.lead_id.clone(),
            enquiry_id: record.enquiry.enquiry_id.clone(),
            already_exists: record.user.already_exists,
        }
    }
}

/// Response returned by the campaign webhook
///
/// # Example
/// ```json
/// {
///   "message": "1 submission(s) processed",
///   "created": [{ "userId": "user001", "leadId": "lead001", "enquiryId": "enq001", "alreadyExists": false }],
///   "skipped": 0
/// }
/// ```
#[derive(Serialize, Debug)]
pub struct CampaignResponse {
    pub message: String,
    pub created: Vec<CreatedSummary>,
    pub skipped: usize,
}
