//! Lead transformer
//!
//! Turns validated submissions into user, lead and enquiry records. The only
//! writes made here are counter bumps; persisting the returned records is up
//! to the caller (see [`Store::persist`]).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Map;
use uuid::Uuid;

use crate::agent::{resolve_agent, AgentDirectory, AgentSource};
use crate::allocator::Namespace;
use crate::database::{enquiry_key, normalize_property_name, Store};
use crate::error::StoreError;
use crate::model::{
    ActivityEntry, AgentAssignment, AgentHistoryEntry, CampaignDetails, EnquiryRecord,
    FollowUpTask, LeadRecord, PhoneEntry, Pipeline, SharedProperty, Submission,
    TransformedRecord, UserRecord,
};

const SOURCE_PLATFORM: &str = "google";
const CONTACT_LABEL: &str = "call";
const INITIAL_STATE: &str = "fresh";
const LEAD_ADDED: &str = "lead added";

/// Delay before the first follow-up call on a campaign lead
pub const FOLLOW_UP_DELAY_SECS: i64 = 86_400;

#[derive(Clone)]
pub struct LeadTransformer {
    store: Arc<Store>,
    agents: Arc<AgentDirectory>,
    agent_source: AgentSource,
}

impl LeadTransformer {
    pub fn new(store: Arc<Store>, agents: Arc<AgentDirectory>, agent_source: AgentSource) -> Self {
        Self {
            store,
            agents,
            agent_source,
        }
    }

    /// Transforms a batch using the current time
    pub fn transform(&self, submissions: &[Submission]) -> Result<Vec<TransformedRecord>, StoreError> {
        self.transform_at(submissions, Utc::now().timestamp())
    }

    /// Transforms a batch, stamping every record with `now` (Unix seconds)
    ///
    /// Submissions are handled one at a time, in order. A submission whose
    /// `(phoneNumber, projectName)` pair is already stored, or appeared
    /// earlier in the batch, is skipped without allocating anything. Any store
    /// failure aborts the whole batch.
    pub fn transform_at(
        &self,
        submissions: &[Submission],
        now: i64,
    ) -> Result<Vec<TransformedRecord>, StoreError> {
        let mut records = Vec::with_capacity(submissions.len());
        let mut seen_pairs = HashSet::new();
        let mut batch_users: HashMap<String, String> = HashMap::new();

        for submission in submissions {
            let phone = submission.phone_number.as_str();
            let project_name = submission.project_name.as_deref().unwrap_or("");

            let pair = enquiry_key(phone, project_name);
            if seen_pairs.contains(&pair) || self.store.is_duplicate(phone, project_name)? {
                tracing::info!("Duplicate lead for {} / {}, skipping", phone, project_name);
                continue;
            }

            let existing = match batch_users.get(phone) {
                Some(user_id) => Some(user_id.clone()),
                None => self.store.find_existing_user(phone)?,
            };
            let already_exists = existing.is_some();
            let user_id = match existing {
                Some(user_id) => {
                    tracing::info!("User already exists with userId: {}", user_id);
                    user_id
                }
                None => self.store.allocate_in(Namespace::User)?,
            };

            let lead_id = self.store.allocate_in(Namespace::Lead)?;
            let enquiry_id = self.store.allocate_in(Namespace::Enquiry)?;
            let property_id = self.store.resolve_property(submission.project_name.as_deref())?;
            let agent = resolve_agent(self.agent_source, &self.agents, submission);

            let record = assemble(
                submission,
                AssignedIds {
                    user_id,
                    lead_id,
                    enquiry_id,
                    property_id,
                },
                &agent,
                already_exists,
                now,
            );

            seen_pairs.insert(pair);
            batch_users.insert(phone.to_string(), record.user.user_id.clone());
            records.push(record);
        }

        tracing::debug!(
            "Transformed {} of {} submission(s)",
            records.len(),
            submissions.len()
        );
        Ok(records)
    }
}

struct AssignedIds {
    user_id: String,
    lead_id: String,
    enquiry_id: String,
    property_id: Option<String>,
}

fn assemble(
    submission: &Submission,
    ids: AssignedIds,
    agent: &AgentAssignment,
    already_exists: bool,
    now: i64,
) -> TransformedRecord {
    let name = submission.name.trim().to_string();
    let agent_name = agent.name.trim().to_lowercase();
    let property_name = normalize_property_name(submission.project_name.as_deref().unwrap_or(""));

    let campaign_details = submission
        .campaign
        .then(|| build_campaign_details(submission, ids.property_id.as_deref(), now));
    let tasks = if submission.campaign {
        vec![collect_requirement_task(agent, now)]
    } else {
        Vec::new()
    };

    let user = UserRecord {
        user_id: ids.user_id.clone(),
        phone_number: submission.phone_number.clone(),
        name: name.clone(),
        campaign: submission.campaign,
        utm_details: submission.utm_details.clone(),
        label: CONTACT_LABEL.to_string(),
        phone_numbers: vec![PhoneEntry {
            label: "primary".to_string(),
            number: submission.phone_number.clone(),
            added_at: now,
        }],
        added: now,
        last_modified: now,
        campaign_details,
        history: Vec::new(),
        already_exists,
    };

    let pipeline = Pipeline {
        user_id: ids.user_id,
        agent_id: agent.id.clone(),
        agent_name: agent_name.clone(),
        agent_email: agent.email.clone(),
        property_name,
        property_id: ids.property_id,
        root_property_name: None,
        root_property_id: None,
        name,
        phone_number: submission.phone_number.clone(),
        label: CONTACT_LABEL.to_string(),
        source: SOURCE_PLATFORM.to_string(),
        lead_status: None,
        stage: None,
        state: INITIAL_STATE.to_string(),
        tag: None,
        task_type: None,
        scheduled_date: None,
        rnr: false,
        rnr_count: 0,
        tasks,
        agent_history: vec![AgentHistoryEntry {
            agent_id: agent.id.clone(),
            agent_name: agent_name.clone(),
            timestamp: now,
            last_stage: None,
        }],
        activity_history: vec![ActivityEntry {
            activity_type: LEAD_ADDED.to_string(),
            timestamp: now,
            agent_name,
            data: Map::new(),
        }],
        notes: Vec::new(),
        documents: Vec::new(),
        requirements: Vec::new(),
        added: now,
        last_modified: now,
    };

    TransformedRecord {
        user,
        lead: LeadRecord {
            lead_id: ids.lead_id.clone(),
            pipeline: pipeline.clone(),
        },
        enquiry: EnquiryRecord {
            enquiry_id: ids.enquiry_id,
            lead_id: ids.lead_id,
            pipeline,
        },
    }
}

/// Campaign metadata for a user who came in through a campaign form
///
/// The chosen project is recorded as a customer-selected shared property.
fn build_campaign_details(
    submission: &Submission,
    property_id: Option<&str>,
    now: i64,
) -> CampaignDetails {
    let shared_properties = submission
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| SharedProperty {
            name: name.to_string(),
            id: submission
                .project_id
                .clone()
                .or_else(|| property_id.map(str::to_string)),
            status: "Customer Selected".to_string(),
            recommended_by: "Customer".to_string(),
            timestamp: now,
        })
        .into_iter()
        .collect();

    CampaignDetails {
        source: "Website".to_string(),
        sub_source: "Google Search".to_string(),
        mode: "Online".to_string(),
        customer_type: "Basic".to_string(),
        status: "Customer".to_string(),
        new_lead: true,
        shared_properties,
    }
}

fn collect_requirement_task(agent: &AgentAssignment, now: i64) -> FollowUpTask {
    FollowUpTask {
        task_id: Uuid::new_v4().to_string(),
        task_name: "Collect Requirement".to_string(),
        action_type: "Call".to_string(),
        agent: agent.email.clone(),
        schedule: now + FOLLOW_UP_DELAY_SECS,
        timestamp: now,
        task_type: "Customer".to_string(),
    }
}
